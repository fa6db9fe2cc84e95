use crate::ExamplePair;

/// One ordered segment of model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContentPart {
    Image { media_type: String, data: String },
    Text(String),
}

impl ContentPart {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }
}

pub(crate) const IDENTIFICATION_GUIDE: &str = "\
You are an expert Magic: The Gathering card identifier. The images above are reference \
examples, each followed by its correct identification. Identify the card in the next image \
the same way, reading each field as follows.\n\n\
CARD NAME: printed in the title bar at the top left. Copy it exactly, including commas and \
accents (e.g. \"Jace, the Mind Sculptor\", \"Lim-Dûl's Vault\").\n\n\
SET CODE: the expansion the printing comes from, as its three-letter code (e.g. M10, ZEN, DOM). \
Cards from 2023 onward print the code in the collector line at the bottom left. Older cards show \
an expansion symbol at the right end of the type line; translate the symbol to its code.\n\n\
BORDER COLOR: the color of the outer frame: Black, White, Silver (un-sets and some promos), \
Gold (World Championship and Collectors' Edition reprints) or Borderless when the art runs to \
the card edge.\n\n\
TYPE: the full type line in the middle of the card, including supertypes and subtypes \
(e.g. \"Legendary Creature - Elf Druid\"). Use a plain hyphen between type and subtype.\n\n\
RARITY: the color of the expansion symbol: black for Common, silver for Uncommon, gold for Rare, \
orange-red for Mythic Rare.\n\n\
MANA COST: the symbols at the top right, written in brace notation such as {2}{W}{U}. Omit the \
field for lands and other cards without a mana cost.\n\n\
POWER/TOUGHNESS: the box at the bottom right of creatures and vehicles, e.g. \"3/3\" or \"*/*\". \
Omit the field for other cards.\n\n\
ARTIST: the name after \"Illus.\" or the brush icon at the bottom of the card.\n\n\
HISTORICAL EXCEPTIONS:\n\
- Limited Edition Alpha (LEA), Beta (LEB), Unlimited (2ED) and Revised (3ED) have no expansion \
symbol. Alpha and Beta have black borders (Alpha corners are noticeably rounder); Unlimited and \
Revised have white borders, and Revised art looks washed out.\n\
- Fourth Edition (4ED) also lacks a symbol; it is white-bordered and its copyright line reads 1995. \
Use the copyright date to tell core-set reprints without a symbol apart.\n\
- Sets printed before Exodus (1998) use a black expansion symbol for every rarity, so rarity \
cannot be read from the symbol color; use your knowledge of the card's printing instead.\n\
- Collectors' Edition and International Edition cards have square corners and gold borders on \
the back; report their front border color as Gold.";

pub(crate) const CLOSING_INSTRUCTION: &str = "\
Identify the card in the image above. Respond with a single JSON object matching the response \
schema and nothing else: no prose, no Markdown.";

/// Context segments shared by every identification request: each example's image
/// followed by its label, then the reading guide.
pub(crate) fn build_context_parts(examples: &[ExamplePair]) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(examples.len() * 2 + 1);
    for example in examples {
        parts.push(ContentPart::Image {
            media_type: example.media_type.to_string(),
            data: example.image_base64.clone(),
        });
        parts.push(ContentPart::text(format!(
            "Correct identification for the card above:\n{}",
            example.card.to_label_json()
        )));
    }
    parts.push(ContentPart::text(IDENTIFICATION_GUIDE));
    parts
}

/// Full request for one image: shared context, the target, then the closing instruction.
pub(crate) fn build_identification_request(
    context: &[ContentPart],
    target: ContentPart,
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(context.len() + 2);
    parts.extend_from_slice(context);
    parts.push(target);
    parts.push(ContentPart::text(CLOSING_INSTRUCTION));
    parts
}

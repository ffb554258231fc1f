//! Label class color sequence

/// Default sequence new classes cycle through
pub const LABEL_CLASS_COLOR_PALETTE: &[&str] = &[
    "#e53e3e", "#dd6b20", "#d69e2e", "#38a169", "#319795", "#3182ce", "#00b5d8",
    "#805ad5", "#d53f8c", "#718096", "#f56565", "#ed8936", "#ecc94b", "#48bb78",
    "#38b2ac", "#4299e1", "#0bc5ea", "#9f7aea", "#ed64a6", "#a0aec0",
];

/// Color drawn for labels without a class
pub const NONE_CLASS_COLOR: &str = "#a0aec0";

pub fn default_palette() -> Vec<String> {
    LABEL_CLASS_COLOR_PALETTE
        .iter()
        .map(|c| (*c).to_string())
        .collect()
}

/// Color for the next class of a dataset
///
/// `existing` is the colors of the dataset's classes in index order. The
/// result follows the last one in the palette sequence, wrapping around;
/// when the last color is not part of the palette the class count picks
/// the slot instead.
pub fn next_class_color(palette: &[String], existing: &[String]) -> String {
    if palette.is_empty() {
        return NONE_CLASS_COLOR.to_string();
    }
    let slot = match existing.last() {
        None => 0,
        Some(last) => palette
            .iter()
            .position(|c| c.eq_ignore_ascii_case(last))
            .map_or(existing.len(), |i| i + 1),
    };
    palette[slot % palette.len()].clone()
}

//! Scene fixtures.

/// YAML for the garden meadow scene shipped in `scenes/meadow.yaml`.
#[must_use]
pub fn sample_scene() -> &'static str {
    include_str!("../../../scenes/meadow.yaml")
}

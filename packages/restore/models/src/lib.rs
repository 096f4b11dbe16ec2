#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `WordPress` media key parsing and image grouping.
//!
//! `WordPress` writes every upload once as the *original* (`photo.jpg`) and
//! then once per registered image size as a *resized variant*
//! (`photo-300x200.jpg`, `photo-150x150.jpg`). This crate turns a flat
//! bucket listing back into those logical images:
//!
//! 1. [`parse_key`] splits a single object key into a [`ParsedName`].
//! 2. [`group::group_objects`] collects parsed keys into
//!    [`group::ImageGroup`]s keyed by base name.
//! 3. [`group::ImageGroup::select_candidate`] picks the variant that best
//!    substitutes for a missing original.
//!
//! Everything here is pure; no storage or image decoding happens.

pub mod group;

use std::str::FromStr as _;
use std::sync::LazyLock;

use regex::Regex;
use strum_macros::EnumString;

pub use group::{GroupedObjects, ImageGroup, Variant, group_objects};

/// Matches a file stem carrying a `WordPress` resize suffix.
///
/// The greedy `base` capture makes the suffix bind to the last `-` in the
/// stem, so `a-1x2-30x40` parses as base `a-1x2` at 30x40.
static SIZE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>.+)-(?P<width>[0-9]+)x(?P<height>[0-9]+)$").expect("valid regex")
});

/// Image file extensions the restorer knows how to handle.
///
/// Parsing is ASCII case-insensitive; the spelling found in the key is kept
/// separately in [`ParsedName::extension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ImageExtension {
    /// `.jpg` / `.jpeg`
    #[strum(serialize = "jpg", serialize = "jpeg")]
    Jpeg,
    /// `.png`
    #[strum(serialize = "png")]
    Png,
    /// `.gif`
    #[strum(serialize = "gif")]
    Gif,
    /// `.webp`
    #[strum(serialize = "webp")]
    Webp,
}

/// Result of parsing a single object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Key without extension and without any size suffix, directory
    /// prefix included (`2023/05/photo`).
    pub base: String,
    /// Width from a `-WxH` suffix, `None` for an original.
    pub width: Option<u32>,
    /// Height from a `-WxH` suffix, `None` for an original.
    pub height: Option<u32>,
    /// Extension as spelled in the key, without the dot.
    pub extension: String,
}

impl ParsedName {
    /// Whether this key is an original (carries no size suffix).
    #[must_use]
    pub const fn is_original(&self) -> bool {
        self.width.is_none()
    }

    /// Pixel dimensions from the size suffix, if any.
    #[must_use]
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

/// Parses an object key using the `WordPress` `<base>-<width>x<height>.<ext>`
/// convention.
///
/// Returns `None` when the key is not a recognised image (no extension, an
/// unknown extension, or a directory marker). Those keys are filtered out
/// of grouping entirely.
///
/// A suffix that is not exactly `-<digits>x<digits>` with non-zero
/// dimensions fitting in a `u32` is kept as part of the base, so the key is
/// treated as an original. This errs towards never overwriting a real file.
#[must_use]
pub fn parse_key(key: &str) -> Option<ParsedName> {
    let (dir, file) = key.rsplit_once('/').unwrap_or(("", key));
    let (stem, extension) = file.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    if ImageExtension::from_str(extension).is_err() {
        return None;
    }

    let (stem_base, dimensions) = split_size_suffix(stem);

    let base = if dir.is_empty() {
        stem_base.to_string()
    } else {
        format!("{dir}/{stem_base}")
    };

    Some(ParsedName {
        base,
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
        extension: extension.to_string(),
    })
}

/// Splits `stem` into its base and `(width, height)` when it ends in a
/// valid size suffix.
fn split_size_suffix(stem: &str) -> (&str, Option<(u32, u32)>) {
    let Some(caps) = SIZE_SUFFIX_RE.captures(stem) else {
        return (stem, None);
    };

    let (Some(base), Some(width), Some(height)) =
        (caps.name("base"), caps.name("width"), caps.name("height"))
    else {
        return (stem, None);
    };

    match (width.as_str().parse::<u32>(), height.as_str().parse::<u32>()) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (base.as_str(), Some((w, h))),
        _ => (stem, None),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn parses_resized_variant() {
        let parsed = parse_key("dog-600x400.jpg").unwrap();
        assert_eq!(parsed.base, "dog");
        assert_eq!(parsed.dimensions(), Some((600, 400)));
        assert_eq!(parsed.extension, "jpg");
        assert!(!parsed.is_original());
    }

    #[test]
    fn parses_original_without_suffix() {
        let parsed = parse_key("cat.jpg").unwrap();
        assert_eq!(parsed.base, "cat");
        assert_eq!(parsed.width, None);
        assert_eq!(parsed.height, None);
        assert!(parsed.is_original());
    }

    #[test]
    fn keeps_directory_prefix_in_base() {
        let parsed = parse_key("wp-content/uploads/2023/05/my-photo-1024x768.png").unwrap();
        assert_eq!(parsed.base, "wp-content/uploads/2023/05/my-photo");
        assert_eq!(parsed.dimensions(), Some((1024, 768)));
        assert_eq!(parsed.extension, "png");
    }

    #[test]
    fn binds_suffix_to_last_dash() {
        let parsed = parse_key("a-1x2-30x40.gif").unwrap();
        assert_eq!(parsed.base, "a-1x2");
        assert_eq!(parsed.dimensions(), Some((30, 40)));
    }

    #[test]
    fn hyphenated_base_without_suffix_is_original() {
        let parsed = parse_key("summer-holiday-beach.jpeg").unwrap();
        assert_eq!(parsed.base, "summer-holiday-beach");
        assert!(parsed.is_original());
    }

    #[test]
    fn non_numeric_suffix_stays_in_base() {
        let parsed = parse_key("bird-???x???.jpg").unwrap();
        assert_eq!(parsed.base, "bird-???x???");
        assert!(parsed.is_original());

        let parsed = parse_key("bird-300xabc.jpg").unwrap();
        assert_eq!(parsed.base, "bird-300xabc");
        assert!(parsed.is_original());
    }

    #[test]
    fn zero_or_overflowing_dimensions_stay_in_base() {
        assert!(parse_key("pic-0x100.jpg").unwrap().is_original());
        assert!(parse_key("pic-100x0.jpg").unwrap().is_original());
        let parsed = parse_key("pic-99999999999x100.jpg").unwrap();
        assert_eq!(parsed.base, "pic-99999999999x100");
        assert!(parsed.is_original());
    }

    #[test]
    fn suffix_without_base_is_original() {
        let parsed = parse_key("uploads/-300x200.jpg").unwrap();
        assert_eq!(parsed.base, "uploads/-300x200");
        assert!(parsed.is_original());
    }

    #[test]
    fn extension_match_is_case_insensitive_and_preserved() {
        let parsed = parse_key("IMG_0001-150x150.JPG").unwrap();
        assert_eq!(parsed.base, "IMG_0001");
        assert_eq!(parsed.extension, "JPG");

        assert_eq!(parse_key("x.WebP").unwrap().extension, "WebP");
    }

    #[test]
    fn image_extension_accepts_both_jpeg_spellings() {
        assert_eq!(ImageExtension::from_str("jpg"), Ok(ImageExtension::Jpeg));
        assert_eq!(ImageExtension::from_str("JPEG"), Ok(ImageExtension::Jpeg));
        assert_eq!(ImageExtension::from_str("Gif"), Ok(ImageExtension::Gif));
        assert!(ImageExtension::from_str("bmp").is_err());
    }

    #[test]
    fn ignores_unrecognised_keys() {
        assert!(parse_key("readme.txt").is_none());
        assert!(parse_key("archive-300x200.zip").is_none());
        assert!(parse_key("no-extension").is_none());
        assert!(parse_key("uploads/2023/").is_none());
        assert!(parse_key(".jpg").is_none());
        assert!(parse_key("photo.jpg.bak").is_none());
    }

    #[test]
    fn dot_in_directory_does_not_count_as_extension() {
        assert!(parse_key("site.example/uploads/readme").is_none());
        let parsed = parse_key("site.example/photo-10x20.webp").unwrap();
        assert_eq!(parsed.base, "site.example/photo");
    }
}

//! Grouping of parsed keys into logical images.

use std::collections::BTreeMap;

use crate::{ParsedName, parse_key};

/// A resized variant of an image, as found in the bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Full object key.
    pub key: String,
    /// Width from the `-WxH` suffix.
    pub width: u32,
    /// Height from the `-WxH` suffix.
    pub height: u32,
    /// Extension as spelled in the key.
    pub extension: String,
}

impl Variant {
    /// Pixel area claimed by the size suffix.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// All objects sharing one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGroup {
    base: String,
    original: Option<String>,
    variants: Vec<Variant>,
}

impl ImageGroup {
    /// Creates an empty group for `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            original: None,
            variants: Vec::new(),
        }
    }

    /// Base name shared by every member (directory prefix included).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Key of the original, if the listing contained one.
    #[must_use]
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Resized variants in listing order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Whether the group already has an original.
    #[must_use]
    pub const fn has_original(&self) -> bool {
        self.original.is_some()
    }

    /// Whether the group has variants but no original, i.e. needs
    /// restoring.
    #[must_use]
    pub const fn is_orphaned(&self) -> bool {
        self.original.is_none() && !self.variants.is_empty()
    }

    /// Adds a parsed key to the group.
    ///
    /// Only the first unsuffixed key is kept as the original; later ones
    /// are dropped since the group is already complete.
    pub fn push(&mut self, key: &str, parsed: ParsedName) {
        match parsed.dimensions() {
            Some((width, height)) => self.variants.push(Variant {
                key: key.to_string(),
                width,
                height,
                extension: parsed.extension,
            }),
            None => {
                if self.original.is_none() {
                    self.original = Some(key.to_string());
                }
            }
        }
    }

    /// Picks the variant with the largest `width * height`.
    ///
    /// Ties go to the variant listed first. Returns `None` when the group
    /// has no variants.
    #[must_use]
    pub fn select_candidate(&self) -> Option<&Variant> {
        let mut best: Option<&Variant> = None;
        for variant in &self.variants {
            if best.is_none_or(|b| variant.area() > b.area()) {
                best = Some(variant);
            }
        }
        best
    }

    /// Key the original would have if restored from `variant`.
    #[must_use]
    pub fn original_key_for(&self, variant: &Variant) -> String {
        format!("{}.{}", self.base, variant.extension)
    }
}

/// Outcome of grouping a full bucket listing.
#[derive(Debug, Clone, Default)]
pub struct GroupedObjects {
    /// Groups keyed by base name. Iteration order is lexicographic.
    pub groups: BTreeMap<String, ImageGroup>,
    /// Total number of keys seen.
    pub objects: u64,
    /// Keys skipped because they are not recognised images.
    pub ignored: u64,
}

impl GroupedObjects {
    /// Groups that have variants but no original.
    pub fn orphaned(&self) -> impl Iterator<Item = &ImageGroup> {
        self.groups.values().filter(|g| g.is_orphaned())
    }

    /// Number of groups that already have an original.
    #[must_use]
    pub fn complete(&self) -> u64 {
        self.groups.values().filter(|g| g.has_original()).count() as u64
    }
}

/// Parses every key and collects the recognised ones into groups.
///
/// Variant order inside each group follows the order of `keys`, which is
/// what [`ImageGroup::select_candidate`] relies on for tie-breaking.
pub fn group_objects<'a, I>(keys: I) -> GroupedObjects
where
    I: IntoIterator<Item = &'a str>,
{
    let mut grouped = GroupedObjects::default();

    for key in keys {
        grouped.objects += 1;

        let Some(parsed) = parse_key(key) else {
            grouped.ignored += 1;
            continue;
        };

        grouped
            .groups
            .entry(parsed.base.clone())
            .or_insert_with_key(|base| ImageGroup::new(base.as_str()))
            .push(key, parsed);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_variants_with_their_original() {
        let grouped = group_objects([
            "photo.jpg",
            "photo-300x200.jpg",
            "photo-150x150.jpg",
            "other-10x10.png",
        ]);

        assert_eq!(grouped.objects, 4);
        assert_eq!(grouped.ignored, 0);
        assert_eq!(grouped.groups.len(), 2);

        let photo = &grouped.groups["photo"];
        assert_eq!(photo.original(), Some("photo.jpg"));
        assert_eq!(photo.variants().len(), 2);
        assert!(!photo.is_orphaned());

        let other = &grouped.groups["other"];
        assert!(other.is_orphaned());
        assert_eq!(grouped.complete(), 1);
        assert_eq!(grouped.orphaned().count(), 1);
    }

    #[test]
    fn counts_ignored_keys() {
        let grouped = group_objects(["notes.txt", "uploads/", "a-1x1.jpg"]);
        assert_eq!(grouped.objects, 3);
        assert_eq!(grouped.ignored, 2);
        assert_eq!(grouped.groups.len(), 1);
    }

    #[test]
    fn selects_largest_area() {
        let grouped = group_objects(["dog-150x100.jpg", "dog-600x400.jpg", "dog-300x300.jpg"]);
        let dog = &grouped.groups["dog"];
        let best = dog.select_candidate().unwrap();
        assert_eq!(best.key, "dog-600x400.jpg");
        assert_eq!(best.area(), 240_000);
        assert_eq!(dog.original_key_for(best), "dog.jpg");
    }

    #[test]
    fn equal_area_picks_first_listed() {
        let grouped = group_objects(["img-200x100.png", "img-100x200.jpg", "img-50x50.jpg"]);
        let best = grouped.groups["img"].select_candidate().unwrap();
        assert_eq!(best.key, "img-200x100.png");

        let grouped = group_objects(["img-100x200.jpg", "img-200x100.png"]);
        let best = grouped.groups["img"].select_candidate().unwrap();
        assert_eq!(best.key, "img-100x200.jpg");
    }

    #[test]
    fn original_key_uses_selected_extension_spelling() {
        let grouped = group_objects(["2024/01/Beach-640x480.JPEG", "2024/01/Beach-320x240.jpg"]);
        let group = &grouped.groups["2024/01/Beach"];
        let best = group.select_candidate().unwrap();
        assert_eq!(group.original_key_for(best), "2024/01/Beach.JPEG");
    }

    #[test]
    fn original_with_other_extension_completes_group() {
        let grouped = group_objects(["logo.PNG", "logo-100x50.png"]);
        let logo = &grouped.groups["logo"];
        assert!(logo.has_original());
        assert!(!logo.is_orphaned());
    }

    #[test]
    fn malformed_suffix_is_not_grouped_with_numeric_variants() {
        let grouped = group_objects(["bird-???x???.jpg", "bird-300x200.jpg"]);
        assert_eq!(grouped.groups.len(), 2);
        assert!(grouped.groups["bird-???x???"].has_original());
        assert!(grouped.groups["bird"].is_orphaned());
    }

    #[test]
    fn same_name_in_different_directories_is_separate() {
        let grouped = group_objects(["2023/a.jpg", "2024/a-10x10.jpg"]);
        assert!(grouped.groups["2023/a"].has_original());
        assert!(grouped.groups["2024/a"].is_orphaned());
    }

    #[test]
    fn large_dimensions_do_not_overflow_area() {
        let grouped = group_objects(["huge-4000000000x4000000000.jpg", "huge-10x10.jpg"]);
        let best = grouped.groups["huge"].select_candidate().unwrap();
        assert_eq!(best.area(), 16_000_000_000_000_000_000);
    }

    #[test]
    fn empty_group_has_no_candidate() {
        let group = ImageGroup::new("x");
        assert!(group.select_candidate().is_none());
        assert!(!group.is_orphaned());
    }
}

//! Style interning: turning inline style declarations into class names and a
//! deduplicated stylesheet.
//!
//! Each render call owns its interner state (see [`RenderContext`]). The same
//! [`StyleEntry`] seen twice in one render maps to the same class name and a
//! single stylesheet rule. Two naming strategies are available:
//!
//! - [`ClassNaming::Sequential`]: `"{property}-{n}"` with a per-render counter.
//!   Cheapest, reproducible for identical trees, but names are only meaningful
//!   inside one rendered document.
//! - [`ClassNaming::ContentHash`]: `"{property}-{hash}"` where the hash is
//!   derived from the entry itself, so the same declaration gets the same
//!   class across renders and processes (useful when the stylesheet is cached
//!   separately from the markup).

use std::collections::HashMap;
use std::fmt::Write as _;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as Base64Engine;
use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::RenderConfig;

/// One CSS declaration plus the conditions it applies under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleEntry {
    /// CSS property name, e.g. `background-color`
    pub property: String,
    /// CSS value, e.g. `red`
    pub value: String,
    /// Full at-rule prelude such as `@media (max-width: 600px)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_rule: Option<String>,
    /// Selector placed in front of the generated class, e.g. `.dark`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_prefix: Option<String>,
    /// Pseudo-class or pseudo-element appended to the class, e.g. `:hover`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudo: Option<String>,
}

impl StyleEntry {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            at_rule: None,
            selector_prefix: None,
            pseudo: None,
        }
    }

    /// Wrap the rule in an arbitrary at-rule (`@supports ...`, `@container ...`).
    pub fn at_rule(mut self, at_rule: impl Into<String>) -> Self {
        self.at_rule = Some(at_rule.into());
        self
    }

    /// Wrap the rule in `@media {query}`.
    pub fn media(self, query: impl AsRef<str>) -> Self {
        let at_rule = format!("@media {}", query.as_ref());
        self.at_rule(at_rule)
    }

    pub fn pseudo(mut self, pseudo: impl Into<String>) -> Self {
        self.pseudo = Some(pseudo.into());
        self
    }

    pub fn hover(self) -> Self {
        self.pseudo(":hover")
    }

    pub fn prefix(mut self, selector: impl Into<String>) -> Self {
        self.selector_prefix = Some(selector.into());
        self
    }

    /// Declaration text as emitted inside the rule body.
    pub fn declaration(&self, force_important: bool) -> String {
        let mut decl = String::with_capacity(self.property.len() + self.value.len() + 12);
        decl.push_str(&self.property);
        decl.push(':');
        decl.push_str(&self.value);
        if force_important && !self.value.trim_end().ends_with("!important") {
            decl.push_str(" !important");
        }
        decl
    }
}

/// Identity of one emitted CSS rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyleKey {
    pub at_rule: Option<String>,
    pub selector: String,
}

/// Insertion-ordered map from [`StyleKey`] to declaration text.
///
/// The first declaration written for a key is kept; later writes for the same
/// key are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    rules: Vec<(StyleKey, String)>,
    index: HashMap<StyleKey, usize>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rule. Returns `false` when the key already existed.
    pub fn insert(&mut self, key: StyleKey, declaration: String) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.rules.len());
        self.rules.push((key, declaration));
        true
    }

    pub fn get(&self, key: &StyleKey) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.rules[position].1.as_str())
    }

    /// Fold another map into this one, keeping existing rules on conflict.
    pub fn merge(&mut self, other: StyleMap) {
        self.rules.reserve(other.rules.len());
        for (key, decl) in other.rules {
            self.insert(key, decl);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StyleKey, &str)> {
        self.rules.iter().map(|(k, d)| (k, d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How class names are minted for newly seen style entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassNaming {
    /// `{property}-{counter}`, counter reset for every render call
    #[default]
    Sequential,
    /// `{property}-{base64url(hash(entry))}`, stable across renders
    ContentHash,
}

/// Build `[prefix ]` + `.class` + `[pseudo]` with a single allocation.
pub fn build_selector(class_name: &str, prefix: Option<&str>, pseudo: Option<&str>) -> String {
    let len = prefix.map_or(0, |p| p.len() + 1) + 1 + class_name.len() + pseudo.map_or(0, str::len);
    let mut selector = String::with_capacity(len);
    if let Some(prefix) = prefix {
        selector.push_str(prefix);
        selector.push(' ');
    }
    selector.push('.');
    selector.push_str(class_name);
    if let Some(pseudo) = pseudo {
        selector.push_str(pseudo);
    }
    selector
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

// murmur3 finaliser
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// 32-bit mixing hash over every field of the entry.
///
/// Optional fields are tagged so that `None` and `Some("")` hash differently,
/// and fields are separated so that moving bytes between adjacent fields
/// changes the result.
pub fn style_entry_hash(entry: &StyleEntry) -> u32 {
    let mut h = FNV_OFFSET;
    h = fnv1a(h, entry.property.as_bytes());
    h = fnv1a(h, &[0x1f]);
    h = fnv1a(h, entry.value.as_bytes());
    for field in [&entry.at_rule, &entry.selector_prefix, &entry.pseudo] {
        match field {
            Some(s) => {
                h = fnv1a(h, &[0x1f, 0x01]);
                h = fnv1a(h, s.as_bytes());
            }
            None => h = fnv1a(h, &[0x1f, 0x00]),
        }
    }
    fmix32(h)
}

/// Content-derived class name for an entry.
pub fn content_hash_class_name(entry: &StyleEntry) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(style_entry_hash(entry).to_be_bytes());
    let mut name = String::with_capacity(entry.property.len() + 1 + encoded.len());
    name.push_str(&entry.property);
    name.push('-');
    name.push_str(&encoded);
    name
}

/// Return the class name for `entry` in this render, minting it and recording
/// its stylesheet rule on first sight.
pub fn intern_class_name(ctx: &mut RenderContext<'_>, entry: &StyleEntry) -> String {
    if let Some(name) = ctx.seen_styles.get(entry) {
        return name.clone();
    }

    let mut name = match ctx.config().class_naming {
        ClassNaming::Sequential => {
            let name = format!("{}-{}", entry.property, ctx.style_counter);
            ctx.style_counter += 1;
            name
        }
        ClassNaming::ContentHash => content_hash_class_name(entry),
    };
    if ctx.minted_names.contains(&name) {
        // Hash collision between two different entries.
        let base_len = name.len();
        let mut suffix = 1usize;
        loop {
            name.truncate(base_len);
            let _ = write!(name, "-{}", suffix);
            if !ctx.minted_names.contains(&name) {
                break;
            }
            suffix += 1;
        }
        log::debug!("class name collision for {}; using {}", entry.property, name);
    }

    let selector = build_selector(
        &name,
        entry.selector_prefix.as_deref(),
        entry.pseudo.as_deref(),
    );
    let declaration = entry.declaration(ctx.config().force_important);
    ctx.styles.insert(
        StyleKey {
            at_rule: entry.at_rule.clone(),
            selector,
        },
        declaration,
    );
    ctx.minted_names.insert(name.clone());
    ctx.seen_styles.insert(entry.clone(), name.clone());
    name
}

fn push_rule(css: &mut String, key: &StyleKey, declaration: &str) {
    css.reserve(key.selector.len() + declaration.len() + 2);
    css.push_str(&key.selector);
    css.push('{');
    css.push_str(declaration);
    css.push('}');
}

/// Generate stylesheet text.
///
/// Rules without an at-rule come first in insertion order, followed by one
/// block per at-rule (in order of first appearance) holding its rules in
/// insertion order. When `config.newline` is non-empty every rule starts on
/// its own line indented by `base_indent`, and rules inside at-rule blocks get
/// one extra indentation step.
pub fn render_stylesheet(styles: &StyleMap, config: &RenderConfig, base_indent: &str) -> String {
    let pretty = !config.newline.is_empty();
    let mut css = String::with_capacity(styles.len() * 32);

    let line = |css: &mut String, extra: bool| {
        if pretty {
            css.push_str(&config.newline);
            css.push_str(base_indent);
            if extra {
                css.push_str(&config.indentation);
            }
        }
    };

    // Single pass: bare rules are written directly, the rest are grouped by
    // at-rule in order of first appearance.
    let mut groups: Vec<(&str, Vec<(&StyleKey, &str)>)> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    for (key, declaration) in styles.iter() {
        match key.at_rule.as_deref() {
            None => {
                line(&mut css, false);
                push_rule(&mut css, key, declaration);
            }
            Some(at_rule) => {
                let slot = *group_of.entry(at_rule).or_insert_with(|| {
                    groups.push((at_rule, Vec::new()));
                    groups.len() - 1
                });
                groups[slot].1.push((key, declaration));
            }
        }
    }

    for (at_rule, rules) in groups {
        line(&mut css, false);
        css.push_str(at_rule);
        css.push('{');
        for (key, declaration) in rules {
            line(&mut css, true);
            push_rule(&mut css, key, declaration);
        }
        line(&mut css, false);
        css.push('}');
    }

    css
}

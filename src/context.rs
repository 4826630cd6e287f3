//! Per-render mutable state.

use std::collections::{HashMap, HashSet};

use crate::node::AttributeMap;
use crate::output::Output;
use crate::style::{StyleEntry, StyleMap};
use crate::RenderConfig;

/// Mutable state owned by exactly one render call.
///
/// A context is created when a render starts, mutated depth-first while the
/// tree is walked and dropped (or its styles harvested) afterwards. It is
/// never shared between renders, so no locking is involved anywhere.
#[derive(Debug)]
pub struct RenderContext<'c> {
    config: &'c RenderConfig,
    /// Attributes pending for the next element
    pub(crate) attributes: AttributeMap,
    pub(crate) current_indentation: String,
    pub(crate) styles: StyleMap,
    pub(crate) style_counter: usize,
    pub(crate) seen_styles: HashMap<StyleEntry, String>,
    pub(crate) minted_names: HashSet<String>,
    /// Inside `<pre>`: no line breaks or indentation are inserted
    pub(crate) preformatted: bool,
}

impl<'c> RenderContext<'c> {
    pub fn new(config: &'c RenderConfig) -> Self {
        Self {
            config,
            attributes: AttributeMap::new(),
            current_indentation: String::new(),
            styles: StyleMap::new(),
            style_counter: 0,
            seen_styles: HashMap::new(),
            minted_names: HashSet::new(),
            preformatted: false,
        }
    }

    pub fn config(&self) -> &'c RenderConfig {
        self.config
    }

    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    pub fn into_styles(self) -> StyleMap {
        self.styles
    }

    /// Attributes that will be applied to the next element rendered.
    pub fn pending_attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn current_indentation(&self) -> &str {
        &self.current_indentation
    }

    /// Start at `depth` indentation steps instead of zero.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.current_indentation = self.config.indentation.repeat(depth);
        self
    }

    /// Take over the interner state of a finished context.
    ///
    /// Used by two-phase document assembly: rules harvested while rendering
    /// the body must appear in the stylesheet, and anything rendered later
    /// with this context must keep minting fresh names rather than restarting
    /// the counter and colliding with names already in the body.
    pub fn absorb(&mut self, other: RenderContext<'_>) {
        self.styles.merge(other.styles);
        self.style_counter = self.style_counter.max(other.style_counter);
        self.seen_styles.extend(other.seen_styles);
        self.minted_names.extend(other.minted_names);
    }

    /// Add one indentation step, returning the length to restore later.
    pub(crate) fn push_indentation(&mut self) -> usize {
        let saved = self.current_indentation.len();
        self.current_indentation.push_str(&self.config.indentation);
        saved
    }

    pub(crate) fn restore_indentation(&mut self, len: usize) {
        self.current_indentation.truncate(len);
    }

    pub(crate) fn pop_indentation(&mut self) {
        let len = self
            .current_indentation
            .len()
            .saturating_sub(self.config.indentation.len());
        self.current_indentation.truncate(len);
    }

    /// Emit newline + current indentation unless inside preformatted content.
    pub(crate) fn line_break(&self, out: &mut impl Output) {
        if self.preformatted {
            return;
        }
        if !self.config.newline.is_empty() {
            out.write_str(&self.config.newline);
        }
        if !self.current_indentation.is_empty() {
            out.write_str(&self.current_indentation);
        }
    }
}

use std::rc::Rc;

/// One variable-font axis override: a four-byte axis tag packed big-endian
/// and its value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontVariation {
    pub axis: u32,
    pub value: f32,
}

/// A decoded font registered with the text stack.
///
/// Wraps the first family name the registration resolved. Glyph-coordinate
/// customization is the caller's business; the variation list starts empty.
#[derive(Clone, Debug)]
pub struct FontHandle {
    pub family: String,
    pub data: Vec<u8>,
    pub variations: Vec<FontVariation>,
}

/// Reference-counted font handle, cacheable by the engine.
pub type SharedFont = Rc<FontHandle>;

/// Owns the font registration context for one factory.
pub(crate) struct FontStore {
    font_ctx: parley::FontContext,
}

impl FontStore {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
        }
    }

    /// Register raw font bytes and wrap the first resolved family.
    ///
    /// Bytes that register no usable family are reported as absence, never
    /// as an error.
    pub(crate) fn register(&mut self, bytes: &[u8]) -> Option<FontHandle> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
        let Some((family_id, _)) = families.first() else {
            tracing::debug!("font bytes registered no families");
            return None;
        };
        let name = self.font_ctx.collection.family_name(*family_id)?;
        Some(FontHandle {
            family: name.to_string(),
            data: bytes.to_vec(),
            variations: Vec::new(),
        })
    }
}

use std::rc::Rc;

/// An owned copy of engine-supplied vertex/index data.
///
/// Buffers are shared so the engine can cache one across frames; the factory
/// always copies the caller's span, which may be transient stack memory.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

/// Reference-counted buffer handle, cacheable by the engine.
pub type SharedBuffer = Rc<RenderBuffer>;

impl RenderBuffer {
    /// Element count, regardless of variant.
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            Self::U16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            Self::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_accessors_are_exclusive() {
        let b = RenderBuffer::F32(vec![1.0, 2.0]);
        assert_eq!(b.len(), 2);
        assert!(b.as_f32().is_some());
        assert!(b.as_u16().is_none());
        assert!(b.as_u32().is_none());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericPrecision {
    F32,
    F64,
}

impl NumericPrecision {
    pub fn scalar_size(self) -> usize {
        match self {
            NumericPrecision::F32 => std::mem::size_of::<f32>(),
            NumericPrecision::F64 => std::mem::size_of::<f64>(),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            NumericPrecision::F32 => "f32",
            NumericPrecision::F64 => "f64",
        }
    }

    /// WGSL scalar type spliced into the shader builders.
    pub(crate) fn scalar_ty(self) -> &'static str {
        self.tag()
    }
}

/// Storage layout of one side of a multiply invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferLayout {
    Interleaved,
    Split,
}

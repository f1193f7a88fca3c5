/// Semantic types assignable to kernel values (closed vocabulary).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Number,
    Float,
    Integer,
    /// An integer-valued literal, promoted to `Number` (or `Integer` inside
    /// a for-loop init) when stored into a declaration slot.
    LiteralInteger,
    Boolean,
    Array2,
    Array3,
    Array4,
    Array,
    Array2D,
    Array3D,
    Input,
    HTMLImage,
    HTMLImageArray,
    NumberTexture,
    ArrayTexture4,
}

impl Ty {
    /// The element type obtained by one level of indexing, or `None` for
    /// non-indexable types.
    pub fn index_once(&self) -> Option<Ty> {
        match self {
            Ty::Array => Some(Ty::Number),
            Ty::Array2 => Some(Ty::Number),
            Ty::Array3 => Some(Ty::Number),
            Ty::Array4 => Some(Ty::Number),
            Ty::Array2D => Some(Ty::Number),
            Ty::Array3D => Some(Ty::Number),
            Ty::Input => Some(Ty::Number),
            Ty::HTMLImage => Some(Ty::Array4),
            Ty::HTMLImageArray => Some(Ty::Array4),
            Ty::NumberTexture => Some(Ty::Number),
            Ty::ArrayTexture4 => Some(Ty::Array4),
            _ => None,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Ty::Number => "Number",
            Ty::Float => "Float",
            Ty::Integer => "Integer",
            Ty::LiteralInteger => "LiteralInteger",
            Ty::Boolean => "Boolean",
            Ty::Array2 => "Array(2)",
            Ty::Array3 => "Array(3)",
            Ty::Array4 => "Array(4)",
            Ty::Array => "Array",
            Ty::Array2D => "Array2D",
            Ty::Array3D => "Array3D",
            Ty::Input => "Input",
            Ty::HTMLImage => "HTMLImage",
            Ty::HTMLImageArray => "HTMLImageArray",
            Ty::NumberTexture => "NumberTexture",
            Ty::ArrayTexture4 => "ArrayTexture(4)",
        }
    }

    /// Parse a type from its display name (settings files, CLI flags,
    /// serialized payloads).
    pub fn from_name(name: &str) -> Option<Ty> {
        let ty = match name {
            "Number" => Ty::Number,
            "Float" => Ty::Float,
            "Integer" => Ty::Integer,
            "LiteralInteger" => Ty::LiteralInteger,
            "Boolean" => Ty::Boolean,
            "Array(2)" => Ty::Array2,
            "Array(3)" => Ty::Array3,
            "Array(4)" => Ty::Array4,
            "Array" => Ty::Array,
            "Array2D" => Ty::Array2D,
            "Array3D" => Ty::Array3D,
            "Input" => Ty::Input,
            "HTMLImage" => Ty::HTMLImage,
            "HTMLImageArray" => Ty::HTMLImageArray,
            "NumberTexture" => Ty::NumberTexture,
            "ArrayTexture(4)" => Ty::ArrayTexture4,
            _ => return None,
        };
        Some(ty)
    }

    /// `Float` surfaces as `Number` when read back through the constant
    /// oracle.
    pub fn normalized_constant(&self) -> Ty {
        match self {
            Ty::Float => Ty::Number,
            other => *other,
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_map_exact() {
        // The one-step indexing table, entry for entry.
        assert_eq!(Ty::Array.index_once(), Some(Ty::Number));
        assert_eq!(Ty::Array2.index_once(), Some(Ty::Number));
        assert_eq!(Ty::Array3.index_once(), Some(Ty::Number));
        assert_eq!(Ty::Array4.index_once(), Some(Ty::Number));
        assert_eq!(Ty::Array2D.index_once(), Some(Ty::Number));
        assert_eq!(Ty::Array3D.index_once(), Some(Ty::Number));
        assert_eq!(Ty::HTMLImage.index_once(), Some(Ty::Array4));
        assert_eq!(Ty::HTMLImageArray.index_once(), Some(Ty::Array4));
        assert_eq!(Ty::NumberTexture.index_once(), Some(Ty::Number));
        assert_eq!(Ty::ArrayTexture4.index_once(), Some(Ty::Array4));
    }

    #[test]
    fn test_scalars_do_not_index() {
        assert_eq!(Ty::Number.index_once(), None);
        assert_eq!(Ty::Integer.index_once(), None);
        assert_eq!(Ty::Boolean.index_once(), None);
        assert_eq!(Ty::LiteralInteger.index_once(), None);
    }

    #[test]
    fn test_display_round_trip() {
        for ty in [
            Ty::Number,
            Ty::Float,
            Ty::Integer,
            Ty::LiteralInteger,
            Ty::Boolean,
            Ty::Array2,
            Ty::Array3,
            Ty::Array4,
            Ty::Array,
            Ty::Array2D,
            Ty::Array3D,
            Ty::Input,
            Ty::HTMLImage,
            Ty::HTMLImageArray,
            Ty::NumberTexture,
            Ty::ArrayTexture4,
        ] {
            assert_eq!(Ty::from_name(ty.display()), Some(ty));
        }
        assert_eq!(Ty::from_name("Array(5)"), None);
    }

    #[test]
    fn test_float_normalizes_to_number() {
        assert_eq!(Ty::Float.normalized_constant(), Ty::Number);
        assert_eq!(Ty::Integer.normalized_constant(), Ty::Integer);
    }
}

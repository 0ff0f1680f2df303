/// Records nested deeper than this are rejected by both readers.
pub const MAX_RECORD_DEPTH: usize = 256;

/// Errors raised while reading the raw FBX node tree.
#[derive(Debug, thiserror::Error)]
pub enum FbxError {
    #[error("not a binary fbx file")]
    InvalidMagic,
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("unknown property type code {0:#04x}")]
    UnknownPropertyType(u8),
    #[error("unknown array encoding {0}")]
    UnknownArrayEncoding(u32),
    #[error("malformed record \"{name}\": {message}")]
    MalformedRecord { name: String, message: String },
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FbxProperty {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl FbxProperty {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FbxProperty::Bool(v) => Some(*v as i64),
            FbxProperty::I16(v) => Some(*v as i64),
            FbxProperty::I32(v) => Some(*v as i64),
            FbxProperty::I64(v) => Some(*v),
            FbxProperty::F32(v) => Some(*v as i64),
            FbxProperty::F64(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FbxProperty::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            FbxProperty::I16(v) => Some(*v as f64),
            FbxProperty::I32(v) => Some(*v as f64),
            FbxProperty::I64(v) => Some(*v as f64),
            FbxProperty::F32(v) => Some(*v as f64),
            FbxProperty::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FbxProperty::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric array converted to doubles, whatever its stored element type.
    pub fn to_f64_array(&self) -> Option<Vec<f64>> {
        match self {
            FbxProperty::F64Array(v) => Some(v.clone()),
            FbxProperty::F32Array(v) => Some(v.iter().map(|x| *x as f64).collect()),
            FbxProperty::I32Array(v) => Some(v.iter().map(|x| *x as f64).collect()),
            FbxProperty::I64Array(v) => Some(v.iter().map(|x| *x as f64).collect()),
            _ => None,
        }
    }

    pub fn to_i32_array(&self) -> Option<Vec<i32>> {
        match self {
            FbxProperty::I32Array(v) => Some(v.clone()),
            FbxProperty::I64Array(v) => Some(v.iter().map(|x| *x as i32).collect()),
            _ => None,
        }
    }

    pub fn to_i64_array(&self) -> Option<Vec<i64>> {
        match self {
            FbxProperty::I64Array(v) => Some(v.clone()),
            FbxProperty::I32Array(v) => Some(v.iter().map(|x| *x as i64).collect()),
            _ => None,
        }
    }
}

/// A record of the FBX node tree, shared by the binary and ASCII encodings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<FbxProperty>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, property: FbxProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_child(mut self, child: FbxNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FbxNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn property(&self, index: usize) -> Option<&FbxProperty> {
        self.properties.get(index)
    }

    /// First property of the child called `name`.
    pub fn child_value(&self, name: &str) -> Option<&FbxProperty> {
        self.child(name).and_then(|c| c.properties.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbxDocument {
    /// File format version, e.g. 7400. Zero when an ASCII file omits it.
    pub version: u32,
    pub nodes: Vec<FbxNode>,
}

impl FbxDocument {
    pub fn node(&self, name: &str) -> Option<&FbxNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Object name without the class part. Binary files store `Name\0\x01Class`,
/// ASCII files `Class::Name`.
pub fn object_name(raw: &str) -> &str {
    if let Some(i) = raw.find("\u{0}\u{1}") {
        return &raw[..i];
    }
    match raw.find("::") {
        Some(i) => &raw[i + 2..],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_drop_class() {
        assert_eq!(object_name("Cube\u{0}\u{1}Model"), "Cube");
        assert_eq!(object_name("Model::Cube"), "Cube");
        assert_eq!(object_name("Cube"), "Cube");
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(FbxProperty::I32(-3).as_f64(), Some(-3.0));
        assert_eq!(FbxProperty::F64(2.5).as_i64(), Some(2));
        assert_eq!(FbxProperty::String("a".into()).as_f64(), None);
        assert_eq!(
            FbxProperty::I64Array(vec![0, -1]).to_i32_array(),
            Some(vec![0, -1])
        );
        assert_eq!(
            FbxProperty::F32Array(vec![0.5]).to_f64_array(),
            Some(vec![0.5])
        );
    }

    #[test]
    fn child_lookup() {
        let node = FbxNode::new("Model")
            .with_child(FbxNode::new("Version").with_property(FbxProperty::I32(232)))
            .with_child(FbxNode::new("P"))
            .with_child(FbxNode::new("P"));
        assert_eq!(node.child_value("Version"), Some(&FbxProperty::I32(232)));
        assert_eq!(node.children_named("P").count(), 2);
        assert!(node.child("Missing").is_none());
    }
}

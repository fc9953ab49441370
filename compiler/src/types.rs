use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub package:     Option<String>,
    pub definitions: Vec<Definition>,
}

impl Schema {
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefinitionKind {
    Enum,
    Struct,
}

/// A field's declared type, before names are resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRef {
    /// A primitive keyword or the name of another definition.
    pub name:         String,
    pub is_array:     bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:          String,
    pub wire_name:     String,
    pub line:          usize,
    pub column:        usize,
    pub type_:         TypeRef,
    pub required:      bool,
    pub ignore_null:   bool,
    pub is_identity:   bool,
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub label:   String,
    pub ordinal: i64,
    pub line:    usize,
    pub column:  usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name:         String,
    pub line:         usize,
    pub column:       usize,
    pub kind:         DefinitionKind,
    pub base:         Option<String>,
    pub fallback:     Option<String>,
    pub capabilities: Vec<String>,
    pub fields:       Vec<Field>,
    pub members:      Vec<EnumMember>,
}

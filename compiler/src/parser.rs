use crate::{
    tokenizer::Token,
    types::{Definition, DefinitionKind, EnumMember, Field, Schema, TypeRef},
    utils::{error, quote},
    error::SchemaError,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref IDENTIFIER:       Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref EQUALS:           Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:        Regex = Regex::new(r"^;$").unwrap();
    static ref COLON:            Regex = Regex::new(r"^:$").unwrap();
    static ref COMMA:            Regex = Regex::new(r"^,$").unwrap();
    static ref QUESTION:         Regex = Regex::new(r"^\?$").unwrap();
    static ref AT:               Regex = Regex::new(r"^@$").unwrap();
    static ref LEFT_PAREN:       Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:      Regex = Regex::new(r"^\)$").unwrap();
    static ref INTEGER:          Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref STRING:           Regex = Regex::new(r#"^"[^"\n]*"$"#).unwrap();
    static ref LEFT_BRACE:       Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:      Regex = Regex::new(r"^\}$").unwrap();
    static ref ARRAY_TOKEN:      Regex = Regex::new(r"^\[\]$").unwrap();
    static ref ENUM_KEYWORD:     Regex = Regex::new(r"^enum$").unwrap();
    static ref STRUCT_KEYWORD:   Regex = Regex::new(r"^struct$").unwrap();
    static ref PACKAGE_KEYWORD:  Regex = Regex::new(r"^package$").unwrap();
    static ref REF_KEYWORD:      Regex = Regex::new(r"^ref$").unwrap();
    static ref EOF:              Regex = Regex::new(r"^$").unwrap();
}

/// `@name` or `@name(arg, ...)` as written in the source.
struct Attribute {
    name:   String,
    args:   Vec<String>,
    line:   usize,
    column: usize,
}

/// Builds the schema model from the tokens of one `.elem` source.
pub fn parse_schema(tokens: &[Token]) -> Result<Schema, SchemaError> {
    let mut definitions  = Vec::new();
    let mut package_text = None;
    let mut index        = 0;

    if tokens.is_empty() {
        return Err(error("Empty token stream", 0, 0));
    }

    // Past-the-end reads keep returning the EOF token.
    fn current_token(tokens: &[Token], index: usize) -> &Token {
        tokens.get(index).unwrap_or(&tokens[tokens.len() - 1])
    }

    fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> bool {
        if *index < tokens.len() && test.is_match(&current_token(tokens, *index).text) {
            *index += 1;
            true
        } else {
            false
        }
    }

    fn expect(tokens: &[Token], index: &mut usize, test: &Regex, expected: &str) -> Result<(), SchemaError> {
        if !eat(tokens, index, test) {
            let tok = current_token(tokens, *index);
            return Err(error(
                &format!("Expected {} but found {}", expected, quote(&tok.text)),
                tok.line,
                tok.column,
            ));
        }
        Ok(())
    }

    fn expect_identifier(tokens: &[Token], index: &mut usize) -> Result<(String, usize, usize), SchemaError> {
        let tok = current_token(tokens, *index);
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        Ok((tok.text.clone(), tok.line, tok.column))
    }

    fn unexpected_token(tokens: &[Token], index: usize) -> SchemaError {
        let tok = current_token(tokens, index);
        error(
            &format!("Unexpected token {}", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    }

    fn parse_attributes(tokens: &[Token], index: &mut usize) -> Result<Vec<Attribute>, SchemaError> {
        let mut attributes = Vec::new();
        while eat(tokens, index, &AT) {
            let (name, line, column) = expect_identifier(tokens, index)?;
            let mut args = Vec::new();
            if eat(tokens, index, &LEFT_PAREN) {
                loop {
                    let (arg, _, _) = expect_identifier(tokens, index)?;
                    args.push(arg);
                    if !eat(tokens, index, &COMMA) {
                        break;
                    }
                }
                expect(tokens, index, &RIGHT_PAREN, "\")\"")?;
            }
            attributes.push(Attribute { name, args, line, column });
        }
        Ok(attributes)
    }

    // Handle package declaration
    if eat(tokens, &mut index, &PACKAGE_KEYWORD) {
        let (name, _, _) = expect_identifier(tokens, &mut index)?;
        package_text = Some(name);
        expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
    }

    // Parse definitions one by one
    while index < tokens.len() && !eat(tokens, &mut index, &EOF) {
        let attributes = parse_attributes(tokens, &mut index)?;

        let kind = if eat(tokens, &mut index, &ENUM_KEYWORD) {
            DefinitionKind::Enum
        } else if eat(tokens, &mut index, &STRUCT_KEYWORD) {
            DefinitionKind::Struct
        } else {
            return Err(unexpected_token(tokens, index));
        };

        let (name, line, column) = expect_identifier(tokens, &mut index)?;

        let mut base = None;
        if eat(tokens, &mut index, &COLON) {
            if kind == DefinitionKind::Enum {
                let tok = current_token(tokens, index - 1);
                return Err(error("Enums cannot have a base type", tok.line, tok.column));
            }
            let (base_name, _, _) = expect_identifier(tokens, &mut index)?;
            base = Some(base_name);
        }

        let mut fallback     = None;
        let mut capabilities = Vec::new();
        for attribute in attributes {
            match attribute.name.as_str() {
                "fallback" => {
                    if attribute.args.len() != 1 {
                        return Err(error(
                            "@fallback takes exactly one type name",
                            attribute.line,
                            attribute.column,
                        ));
                    }
                    fallback = attribute.args.into_iter().next();
                }
                "implements" => capabilities.extend(attribute.args),
                other => debug!(attribute = other, definition = %name, "ignoring unknown definition attribute"),
            }
        }

        expect(tokens, &mut index, &LEFT_BRACE, "\"{\"")?;

        let mut fields  = Vec::new();
        let mut members = Vec::new();
        while !eat(tokens, &mut index, &RIGHT_BRACE) {
            if eat(tokens, &mut index, &EOF) {
                let tok = current_token(tokens, index - 1);
                return Err(error("Expected \"}\" but found end of input", tok.line, tok.column));
            }

            if kind == DefinitionKind::Enum {
                let (label, m_line, m_column) = expect_identifier(tokens, &mut index)?;
                expect(tokens, &mut index, &EQUALS, "\"=\"")?;
                let v_tok = current_token(tokens, index);
                expect(tokens, &mut index, &INTEGER, "integer")?;
                let ordinal = v_tok.text.parse::<i64>().map_err(|_| {
                    error(
                        &format!("Invalid integer {}", quote(&v_tok.text)),
                        v_tok.line,
                        v_tok.column,
                    )
                })?;
                // Member attributes carry no meaning yet.
                parse_attributes(tokens, &mut index)?;
                expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
                members.push(EnumMember { label, ordinal, line: m_line, column: m_column });
                continue;
            }

            let is_reference = eat(tokens, &mut index, &REF_KEYWORD);
            let (type_name, _, _) = expect_identifier(tokens, &mut index)?;
            let is_array = eat(tokens, &mut index, &ARRAY_TOKEN);
            let optional = eat(tokens, &mut index, &QUESTION);

            let (field_name, f_line, f_column) = expect_identifier(tokens, &mut index)?;

            let mut wire_name = field_name.clone();
            if eat(tokens, &mut index, &EQUALS) {
                let s_tok = current_token(tokens, index);
                expect(tokens, &mut index, &STRING, "quoted wire name")?;
                wire_name = s_tok.text.trim_matches('"').to_string();
                if wire_name.is_empty() {
                    return Err(error("Wire names cannot be empty", s_tok.line, s_tok.column));
                }
            }

            let mut ignore_null   = false;
            let mut is_identity   = false;
            let mut is_deprecated = false;
            for attribute in parse_attributes(tokens, &mut index)? {
                match attribute.name.as_str() {
                    "id" => is_identity = true,
                    "ignore_null" => ignore_null = true,
                    "deprecated" => is_deprecated = true,
                    other => debug!(attribute = other, field = %field_name, "ignoring unknown field attribute"),
                }
            }

            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;

            fields.push(Field {
                name: field_name,
                wire_name,
                line: f_line,
                column: f_column,
                type_: TypeRef {
                    name: type_name,
                    is_array,
                    is_reference,
                },
                required: !optional,
                ignore_null,
                is_identity,
                is_deprecated,
            });
        }

        definitions.push(Definition {
            name,
            line,
            column,
            kind,
            base,
            fallback,
            capabilities,
            fields,
            members,
        });
    }

    Ok(Schema {
        package: package_text,
        definitions,
    })
}

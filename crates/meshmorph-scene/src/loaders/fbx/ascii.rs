use super::document::{FbxDocument, FbxError, FbxNode, FbxProperty, MAX_RECORD_DEPTH};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Int(i64),
    Float(f64),
    Colon,
    Comma,
    Star,
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    line: usize,
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '|' || c == '-' || c == '.'
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '+' || c == '.' || c == 'e' || c == 'E'
}

fn tokenize(text: &str) -> Result<Vec<Spanned>, FbxError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ':' | ',' | '*' | '{' | '}' => {
                chars.next();
                let token = match c {
                    ':' => Token::Colon,
                    ',' => Token::Comma,
                    '*' => Token::Star,
                    '{' => Token::Open,
                    _ => Token::Close,
                };
                tokens.push(Spanned { token, line });
            }
            '"' => {
                chars.next();
                let start_line = line;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            value.push(c);
                        }
                        None => {
                            return Err(FbxError::Syntax {
                                line: start_line,
                                message: String::from("unterminated string"),
                            })
                        }
                    }
                }
                tokens.push(Spanned {
                    token: Token::Str(value.replace("&quot;", "\"")),
                    line: start_line,
                });
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_number_char(c) {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                tokens.push(Spanned {
                    token: parse_number(&text, line)?,
                    line,
                });
            }
            c if is_word_start(c) => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                tokens.push(Spanned {
                    token: Token::Word(text),
                    line,
                });
            }
            other => {
                return Err(FbxError::Syntax {
                    line,
                    message: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str, line: usize) -> Result<Token, FbxError> {
    let is_float = text.contains(|c| c == '.' || c == 'e' || c == 'E');
    if !is_float {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(Token::Int(v));
        }
    }

    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| FbxError::Syntax {
            line,
            message: format!("invalid number \"{}\"", text),
        })
}

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset).map(|t| &t.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|t| t.token.clone());
        self.position += 1;
        token
    }

    fn error<T>(&self, message: String) -> Result<T, FbxError> {
        Err(FbxError::Syntax {
            line: self.line(),
            message,
        })
    }

    /// A bare word followed by a colon starts a new record.
    fn at_record_start(&self) -> bool {
        matches!(self.peek(), Some(Token::Word(_))) && self.peek_at(1) == Some(&Token::Colon)
    }

    /// Whether the current value list ended.
    fn at_values_end(&self) -> bool {
        self.at_record_start()
            || matches!(self.peek(), Some(Token::Open) | Some(Token::Close) | None)
    }

    fn parse_nodes(&mut self, depth: usize) -> Result<Vec<FbxNode>, FbxError> {
        if depth > MAX_RECORD_DEPTH {
            return self.error(format!("records nested deeper than {}", MAX_RECORD_DEPTH));
        }

        let nested = depth > 0;
        let mut nodes = Vec::new();
        loop {
            match self.peek() {
                None if nested => return self.error(String::from("missing '}'")),
                None => return Ok(nodes),
                Some(Token::Close) if nested => {
                    self.next();
                    return Ok(nodes);
                }
                _ => nodes.push(self.parse_node(depth)?),
            }
        }
    }

    fn parse_node(&mut self, depth: usize) -> Result<FbxNode, FbxError> {
        let name = match self.next() {
            Some(Token::Word(name)) => name,
            other => return self.error(format!("expected record name, found {:?}", other)),
        };
        if self.next() != Some(Token::Colon) {
            return self.error(format!("expected ':' after \"{}\"", name));
        }

        let mut node = FbxNode::new(name);
        let mut is_array = false;

        while !self.at_values_end() {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    match self.next() {
                        Some(Token::Int(_)) => is_array = true,
                        other => {
                            return self.error(format!("expected array length, found {:?}", other))
                        }
                    }
                }
                // Empty value, as in `Content: , "..."`.
                Some(Token::Comma) => {}
                _ => {
                    let value = self.parse_value()?;
                    node.properties.push(value);
                }
            }

            if self.peek() == Some(&Token::Comma) {
                self.next();
            } else {
                break;
            }
        }

        if self.peek() == Some(&Token::Open) {
            self.next();
            node.children = self.parse_nodes(depth + 1)?;
        }

        if is_array {
            collapse_array(&mut node);
        }

        Ok(node)
    }

    fn parse_value(&mut self) -> Result<FbxProperty, FbxError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(FbxProperty::String(s)),
            Some(Token::Int(v)) => Ok(FbxProperty::I64(v)),
            Some(Token::Float(v)) => Ok(FbxProperty::F64(v)),
            Some(Token::Word(w)) => Ok(FbxProperty::String(w)),
            other => self.error(format!("expected value, found {:?}", other)),
        }
    }
}

/// Replaces the `a: ...` child of an array record by a single array property.
fn collapse_array(node: &mut FbxNode) {
    let index = match node.children.iter().position(|c| c.name == "a") {
        Some(i) => i,
        None => {
            node.properties.push(FbxProperty::F64Array(Vec::new()));
            return;
        }
    };
    let values = node.children.remove(index).properties;

    let all_ints = values.iter().all(|v| matches!(v, FbxProperty::I64(_)));
    let array = if all_ints {
        FbxProperty::I64Array(values.iter().filter_map(|v| v.as_i64()).collect())
    } else {
        FbxProperty::F64Array(values.iter().filter_map(|v| v.as_f64()).collect())
    };
    node.properties.push(array);
}

/// Parses an ASCII FBX document.
pub fn parse_ascii(text: &str) -> Result<FbxDocument, FbxError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        position: 0,
    };
    let nodes = parser.parse_nodes(0)?;

    let version = nodes
        .iter()
        .find(|n| n.name == "FBXHeaderExtension")
        .and_then(|n| n.child_value("FBXVersion"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0) as u32;

    Ok(FbxDocument { version, nodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"; FBX 7.4.0 project file
; ----------------------------------------------------

FBXHeaderExtension:  {
	FBXHeaderVersion: 1003
	FBXVersion: 7400
}
Objects:  {
	Geometry: 140, "Geometry::Cube", "Mesh" {
		Vertices: *6 {
			a: 0,1.5,-2,3e1,4,5
		}
		PolygonVertexIndex: *3 {
			a: 0,1,-3
		}
		GeometryVersion: 124
	}
	Model: 150, "Model::Cube", "Mesh" {
		Properties70:  {
			P: "Lcl Translation", "Lcl Translation", "", "A",1,2,3
		}
		Shading: Y
		Culling: "CullingOff"
	}
}
Connections:  {
	C: "OO",150,0
}
"#;

    #[test]
    fn parses_records_and_arrays() {
        let document = parse_ascii(SAMPLE).unwrap();
        assert_eq!(document.version, 7400);

        let objects = document.node("Objects").unwrap();
        let geometry = objects.child("Geometry").unwrap();
        assert_eq!(geometry.property(0), Some(&FbxProperty::I64(140)));
        assert_eq!(geometry.property(1).and_then(|p| p.as_str()), Some("Geometry::Cube"));

        let vertices = geometry.child_value("Vertices").unwrap();
        assert_eq!(vertices, &FbxProperty::F64Array(vec![0.0, 1.5, -2.0, 30.0, 4.0, 5.0]));
        let indices = geometry.child_value("PolygonVertexIndex").unwrap();
        assert_eq!(indices.to_i32_array(), Some(vec![0, 1, -3]));
        assert!(geometry.child("a").is_none());
    }

    #[test]
    fn bare_words_end_at_next_record() {
        let document = parse_ascii(SAMPLE).unwrap();
        let model = document.node("Objects").unwrap().child("Model").unwrap();
        assert_eq!(model.child_value("Shading"), Some(&FbxProperty::String("Y".into())));
        assert_eq!(
            model.child_value("Culling"),
            Some(&FbxProperty::String("CullingOff".into()))
        );

        let p = model.child("Properties70").unwrap().child("P").unwrap();
        assert_eq!(p.properties.len(), 7);
        assert_eq!(p.property(6), Some(&FbxProperty::I64(3)));

        let c = document.node("Connections").unwrap().child("C").unwrap();
        assert_eq!(c.property(0).and_then(|p| p.as_str()), Some("OO"));
        assert_eq!(c.property(2), Some(&FbxProperty::I64(0)));
    }

    #[test]
    fn empty_records_are_allowed() {
        let document = parse_ascii("Takes:  {\n\tCurrent: \"\"\n}\nEmpty: \n").unwrap();
        assert_eq!(document.nodes.len(), 2);
        assert!(document.nodes[1].properties.is_empty());
    }

    #[test]
    fn empty_values_are_skipped() {
        let text = concat!(
            "Video: 1, \"Video::Tex\", \"Clip\" {\n",
            "\tContent: , \"aGVsbG8=\"\n",
            "\tEmpty: ,\n",
            "\tUseMipMap: 0\n",
            "}\n"
        );
        let document = parse_ascii(text).unwrap();
        let video = document.node("Video").unwrap();
        assert_eq!(
            video.child_value("Content").and_then(|p| p.as_str()),
            Some("aGVsbG8=")
        );
        assert!(video.child("Empty").unwrap().properties.is_empty());
        assert_eq!(video.child_value("UseMipMap"), Some(&FbxProperty::I64(0)));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let depth = MAX_RECORD_DEPTH + 8;
        let text = format!("{}{}", "A: {\n".repeat(depth), "}\n".repeat(depth));
        assert!(matches!(parse_ascii(&text), Err(FbxError::Syntax { .. })));

        let shallow = format!("{}{}", "A: {\n".repeat(8), "}\n".repeat(8));
        assert!(parse_ascii(&shallow).is_ok());
    }

    #[test]
    fn syntax_errors_carry_line() {
        match parse_ascii("Objects:  {\n\tModel: 1, \"Model::A\" {\n") {
            Err(FbxError::Syntax { line, .. }) => assert!(line >= 2),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(parse_ascii("Name: \"open").is_err());
    }
}

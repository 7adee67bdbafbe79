//! The instruction-script format.
//!
//! A script is a flat stream of `-TAG` instructions, each followed by its
//! `+SUBTAG`s and arguments, for example:
//!
//! ```text
//! -read +nodefile users.tsv +edgefile follows.tsv +arg name "my graph"
//! -scale 10.0
//! -generate nodes_out.tsv edges_out.tsv 3
//! ```
//!
//! Tokens are separated by whitespace; `"..."` keeps whitespace inside an
//! argument. Tags and subtags are case-insensitive, arguments keep their
//! case. Template/replacement pairs are substituted textually before
//! tokenizing, which lets one script be executed against many inputs.

use std::collections::BTreeMap;

use anyhow::bail;

/// One lexical token of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `-TAG`, uppercased
    Tag(String),
    /// `+SUBTAG`, uppercased
    Subtag(String),
    /// Everything else, verbatim
    Argument(String),
}

/// Payload of a `-READ` instruction: which files to read, which columns to
/// use, and extra meta entries for the fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadInstruction {
    pub node_files: Vec<String>,
    pub edge_files: Vec<String>,
    pub node_id_col: usize,
    pub node_type_cols: Vec<usize>,
    pub source_col: usize,
    pub target_col: usize,
    pub edge_type_cols: Vec<usize>,
    pub meta: BTreeMap<String, String>,
}

impl Default for ReadInstruction {
    fn default() -> Self {
        ReadInstruction {
            node_files: Vec::new(),
            edge_files: Vec::new(),
            node_id_col: 0,
            node_type_cols: vec![1],
            source_col: 0,
            target_col: 1,
            edge_type_cols: vec![2],
            meta: BTreeMap::new(),
        }
    }
}

/// Payload of a `-GENERATE` instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateInstruction {
    pub node_path: String,
    pub edge_path: String,
    pub count: usize,
}

/// Payload of an `-EXECUTE` instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteInstruction {
    pub script_path: String,
    pub replacements: Vec<(String, String)>,
}

/// One parsed instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Read(ReadInstruction),
    Execute(ExecuteInstruction),
    Load { path: String },
    Save { path: String },
    Scale { factor: f64 },
    Seed { phrase: String },
    Generate(GenerateInstruction),
    Help,
}

/// Split a script into tokens, substituting template/replacement pairs
/// first. An unterminated quotation is fatal.
pub fn tokenize(input: &str, replacements: &[(String, String)]) -> anyhow::Result<Vec<Token>> {
    let mut text = input.to_string();
    for (template, value) in replacements {
        text = text.replace(template.as_str(), value);
    }

    let mut raw: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut in_quotes = false;
    let mut in_token = false;
    for ch in text.chars() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            } else {
                buffer.push(ch);
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                in_token = true;
            }
            ' ' | '\t' | '\n' | '\r' => {
                if in_token {
                    raw.push(std::mem::take(&mut buffer));
                    in_token = false;
                }
            }
            _ => {
                buffer.push(ch);
                in_token = true;
            }
        }
    }
    if in_quotes {
        bail!("encountered an unmatched quotation mark; check your input");
    }
    if in_token {
        raw.push(buffer);
    }

    Ok(raw
        .into_iter()
        .map(|token| {
            if token.starts_with('-') {
                Token::Tag(token.to_uppercase())
            } else if token.starts_with('+') {
                Token::Subtag(token.to_uppercase())
            } else {
                Token::Argument(token)
            }
        })
        .collect())
}

fn argument<'a>(token: &'a Token, context: &str) -> anyhow::Result<&'a str> {
    match token {
        Token::Argument(value) => Ok(value),
        other => bail!("expected an argument for {context}, got {other:?}"),
    }
}

fn single_argument(body: &[Token], name: &str) -> anyhow::Result<String> {
    match body {
        [token] => Ok(argument(token, name)?.to_string()),
        _ => bail!(
            "the {name} instruction expects exactly one argument, got {}",
            body.len()
        ),
    }
}

fn parse_index(value: &str, context: &str) -> anyhow::Result<usize> {
    value.parse().map_err(|_| {
        anyhow::anyhow!("could not convert argument '{value}' of {context} to a column index")
    })
}

fn parse_read(body: &[Token]) -> anyhow::Result<ReadInstruction> {
    let mut instruction = ReadInstruction::default();
    let mut node_type_cols_overridden = false;
    let mut edge_type_cols_overridden = false;

    let mut index = 0;
    while index < body.len() {
        let Token::Subtag(subtag) = &body[index] else {
            bail!(
                "expected a +SUBTAG inside the READ instruction, got {:?}",
                body[index]
            );
        };
        let mut end = index + 1;
        while end < body.len() && matches!(body[end], Token::Argument(_)) {
            end += 1;
        }
        // The scan above stops at the next tag or subtag, so everything in
        // between is an argument.
        let args: Vec<&str> = body[index + 1..end]
            .iter()
            .filter_map(|token| match token {
                Token::Argument(value) => Some(value.as_str()),
                _ => None,
            })
            .collect();

        match subtag.as_str() {
            "+NODEFILE" => instruction
                .node_files
                .extend(args.iter().map(|a| a.to_string())),
            "+EDGEFILE" => instruction
                .edge_files
                .extend(args.iter().map(|a| a.to_string())),
            "+NODEINDEX" => {
                let [value] = args.as_slice() else {
                    bail!("+NODEINDEX expects exactly one column index");
                };
                instruction.node_id_col = parse_index(value, "+NODEINDEX")?;
            }
            "+NODETYPEINDEX" => {
                if args.is_empty() {
                    bail!("+NODETYPEINDEX expects at least one column index");
                }
                if !node_type_cols_overridden {
                    instruction.node_type_cols.clear();
                    node_type_cols_overridden = true;
                }
                for value in &args {
                    instruction
                        .node_type_cols
                        .push(parse_index(value, "+NODETYPEINDEX")?);
                }
            }
            "+EDGEINDEX" => {
                let [source, target] = args.as_slice() else {
                    bail!("+EDGEINDEX expects exactly two column indices");
                };
                instruction.source_col = parse_index(source, "+EDGEINDEX")?;
                instruction.target_col = parse_index(target, "+EDGEINDEX")?;
            }
            "+EDGETYPEINDEX" => {
                if args.is_empty() {
                    bail!("+EDGETYPEINDEX expects at least one column index");
                }
                if !edge_type_cols_overridden {
                    instruction.edge_type_cols.clear();
                    edge_type_cols_overridden = true;
                }
                for value in &args {
                    instruction
                        .edge_type_cols
                        .push(parse_index(value, "+EDGETYPEINDEX")?);
                }
            }
            "+ARG" => {
                let [key, value] = args.as_slice() else {
                    bail!("+ARG expects a KEY and a VALUE argument");
                };
                instruction
                    .meta
                    .insert(key.to_uppercase(), value.to_string());
            }
            other => bail!("unknown READ sub-instruction '{other}'"),
        }
        index = end;
    }
    Ok(instruction)
}

/// Parse a token stream into instructions. Each `-TAG` owns all tokens up
/// to the next `-TAG`.
pub fn parse(tokens: &[Token]) -> anyhow::Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let Token::Tag(tag) = &tokens[index] else {
            bail!(
                "unexpected token {:?} before the first instruction tag",
                tokens[index]
            );
        };
        let mut end = index + 1;
        while end < tokens.len() && !matches!(tokens[end], Token::Tag(_)) {
            end += 1;
        }
        let body = &tokens[index + 1..end];

        match tag.as_str() {
            "-READ" => instructions.push(Instruction::Read(parse_read(body)?)),
            "-EXECUTE" => {
                // One script path followed by template/replacement pairs.
                if body.is_empty() || body.len() % 2 != 1 {
                    bail!(
                        "the EXECUTE instruction expects one script path and zero or more \
                         PAIRS of template/replacement arguments"
                    );
                }
                let script_path = argument(&body[0], "EXECUTE")?.to_string();
                let mut replacements = Vec::new();
                for pair in body[1..].chunks(2) {
                    replacements.push((
                        argument(&pair[0], "EXECUTE template")?.to_string(),
                        argument(&pair[1], "EXECUTE replacement")?.to_string(),
                    ));
                }
                instructions.push(Instruction::Execute(ExecuteInstruction {
                    script_path,
                    replacements,
                }));
            }
            "-LOAD" => instructions.push(Instruction::Load {
                path: single_argument(body, "LOAD")?,
            }),
            "-SAVE" => instructions.push(Instruction::Save {
                path: single_argument(body, "SAVE")?,
            }),
            "-SCALE" => {
                let raw = single_argument(body, "SCALE")?;
                let factor: f64 = raw.parse().map_err(|_| {
                    anyhow::anyhow!("could not convert argument '{raw}' of SCALE to a number")
                })?;
                if !(factor > 0.0) {
                    bail!("scaling factor '{raw}' must be greater than 0");
                }
                instructions.push(Instruction::Scale { factor });
            }
            "-SEED" => instructions.push(Instruction::Seed {
                phrase: single_argument(body, "SEED")?,
            }),
            "-GENERATE" => {
                let [node, edge, count] = body else {
                    bail!(
                        "the GENERATE instruction expects a node file path, an edge file \
                         path, and an instance count"
                    );
                };
                let count_raw = argument(count, "GENERATE")?;
                instructions.push(Instruction::Generate(GenerateInstruction {
                    node_path: argument(node, "GENERATE")?.to_string(),
                    edge_path: argument(edge, "GENERATE")?.to_string(),
                    count: count_raw.parse().map_err(|_| {
                        anyhow::anyhow!(
                            "could not convert argument '{count_raw}' of GENERATE to a count"
                        )
                    })?,
                }));
            }
            "-HELP" => instructions.push(Instruction::Help),
            other => bail!("unknown instruction tag '{other}'"),
        }
        index = end;
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_script(text: &str) -> anyhow::Result<Vec<Instruction>> {
        parse(&tokenize(text, &[])?)
    }

    #[test]
    fn quotes_keep_whitespace_and_tags_fold_case() {
        let tokens = tokenize("-Read +Arg name \"my graph\"", &[]).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Tag("-READ".into()),
                Token::Subtag("+ARG".into()),
                Token::Argument("name".into()),
                Token::Argument("my graph".into()),
            ]
        );
    }

    #[test]
    fn unmatched_quote_is_fatal() {
        assert!(tokenize("-load \"model.m1", &[]).is_err());
    }

    #[test]
    fn templates_are_substituted_before_tokenizing() {
        let replacements = vec![("%OUT%".to_string(), "result.model".to_string())];
        let tokens = tokenize("-save %OUT%", &replacements).unwrap();
        assert_eq!(tokens[1], Token::Argument("result.model".into()));
    }

    #[test]
    fn read_defaults_and_overrides() {
        let parsed = parse_script(
            "-read +nodefile a.tsv b.tsv +edgefile c.tsv +nodetypeindex 2 3 +arg name G",
        )
        .unwrap();
        let [Instruction::Read(read)] = parsed.as_slice() else {
            panic!("expected one READ instruction, got {parsed:?}");
        };
        assert_eq!(read.node_files, vec!["a.tsv", "b.tsv"]);
        assert_eq!(read.edge_files, vec!["c.tsv"]);
        assert_eq!(read.node_id_col, 0);
        assert_eq!(read.node_type_cols, vec![2, 3]);
        assert_eq!(read.edge_type_cols, vec![2]);
        assert_eq!(read.meta["NAME"], "G");
    }

    #[test]
    fn scale_requires_a_positive_number() {
        assert!(parse_script("-scale 2.5").is_ok());
        assert!(parse_script("-scale 0").is_err());
        assert!(parse_script("-scale -1").is_err());
        assert!(parse_script("-scale many").is_err());
    }

    #[test]
    fn generate_requires_three_arguments() {
        let parsed = parse_script("-generate n.tsv e.tsv 4").unwrap();
        assert_eq!(
            parsed,
            vec![Instruction::Generate(GenerateInstruction {
                node_path: "n.tsv".into(),
                edge_path: "e.tsv".into(),
                count: 4,
            })]
        );
        assert!(parse_script("-generate n.tsv e.tsv").is_err());
    }

    #[test]
    fn execute_takes_template_pairs() {
        let parsed = parse_script("-execute sub.s1 %A% 1 %B% 2").unwrap();
        let [Instruction::Execute(execute)] = parsed.as_slice() else {
            panic!("expected one EXECUTE instruction");
        };
        assert_eq!(execute.script_path, "sub.s1");
        assert_eq!(
            execute.replacements,
            vec![("%A%".to_string(), "1".to_string()), ("%B%".to_string(), "2".to_string())]
        );
        assert!(parse_script("-execute sub.s1 %A%").is_err());
    }

    #[test]
    fn unknown_tags_and_stray_arguments_are_fatal() {
        assert!(parse_script("-frobnicate").is_err());
        assert!(parse_script("stray -help").is_err());
    }

    #[test]
    fn instructions_chain_in_order() {
        let parsed = parse_script("-load m.model -scale 2 -save out.model -help").unwrap();
        assert_eq!(parsed.len(), 4);
        assert!(matches!(parsed[0], Instruction::Load { .. }));
        assert!(matches!(parsed[3], Instruction::Help));
    }
}

use mem_sim::DataType;

/// One parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        text_size: u32,
        data_size: u32,
    },
    Allocate {
        pid: u32,
        name: String,
        data_type: DataType,
        num_elements: u32,
    },
    Set {
        pid: u32,
        name: String,
        offset: u32,
        values: Vec<String>,
    },
    Free {
        pid: u32,
        name: String,
    },
    Terminate {
        pid: u32,
    },
    Print {
        target: String,
    },
}

impl Command {
    /// Parses one command line. `None` covers unknown verbs and malformed
    /// arguments alike; the caller answers both with the same diagnostic.
    pub fn parse(line: &str) -> Option<Command> {
        let tokens = split_command_line(line);
        let (verb, args) = tokens.split_first()?;

        match verb.as_str() {
            "create" => {
                let [text_size, data_size] = args else {
                    return None;
                };
                Some(Command::Create {
                    text_size: text_size.parse().ok()?,
                    data_size: data_size.parse().ok()?,
                })
            }
            "allocate" => {
                let [pid, name, data_type, num_elements] = args else {
                    return None;
                };
                Some(Command::Allocate {
                    pid: pid.parse().ok()?,
                    name: name.clone(),
                    data_type: data_type.parse().ok()?,
                    num_elements: num_elements.parse().ok()?,
                })
            }
            "set" => {
                if args.len() < 3 {
                    return None;
                }
                Some(Command::Set {
                    pid: args[0].parse().ok()?,
                    name: args[1].clone(),
                    offset: args[2].parse().ok()?,
                    values: args[3..].to_vec(),
                })
            }
            "free" => {
                let [pid, name] = args else {
                    return None;
                };
                Some(Command::Free {
                    pid: pid.parse().ok()?,
                    name: name.clone(),
                })
            }
            "terminate" => {
                let [pid] = args else {
                    return None;
                };
                Some(Command::Terminate { pid: pid.parse().ok()? })
            }
            "print" => {
                let [target] = args else {
                    return None;
                };
                Some(Command::Print {
                    target: target.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Splits a command line on spaces; double-quoted runs stay one token.
pub fn split_command_line(line: &str) -> Vec<String> {
    enum State {
        Gap,
        InWord,
        InString,
    }

    let mut state = State::Gap;
    let mut token = String::new();
    let mut result = Vec::new();

    for c in line.chars() {
        match state {
            State::Gap => {
                if c == '"' {
                    state = State::InString;
                } else if c != ' ' {
                    state = State::InWord;
                    token.push(c);
                }
            }
            State::InWord => {
                if c == ' ' {
                    result.push(std::mem::take(&mut token));
                    state = State::Gap;
                } else {
                    token.push(c);
                }
            }
            State::InString => {
                if c == '"' {
                    result.push(std::mem::take(&mut token));
                    state = State::Gap;
                } else {
                    token.push(c);
                }
            }
        }
    }
    if !matches!(state, State::Gap) {
        result.push(token);
    }
    result
}

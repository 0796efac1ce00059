use std::io::Write;

use crate::bencoding::{Error, Value};

const MAX_DEPTH: usize = 256;
const MAX_PREALLOCATION: usize = 1024 * 8;

/// Incremental bencode parser. Bytes can be fed one at a time (or in chunks through the
/// [`Write`] impl) as they arrive from a file or a socket.
#[derive(Debug)]
pub struct Parser {
    state: State,
    stack: Vec<StackState>,
    position: usize,
}

#[derive(Debug)]
enum State {
    Ready,
    Integer { negative: bool, value: Option<i64> },
    StringLength(usize),
    StringContents(Vec<u8>, usize),
    Done(Value),
}

#[derive(Debug)]
enum StackState {
    List(Vec<Value>),
    Dictionary(Option<Vec<u8>>, Vec<(Vec<u8>, Value)>),
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Ready,
            stack: Vec::new(),
            position: 0,
        }
    }

    pub fn consume(&mut self, byte: u8) -> Result<(), Error> {
        let position = self.position;
        let malformed = |reason: &str| Error::Malformed {
            position,
            reason: reason.to_string(),
        };
        match (&mut self.state, byte) {
            // String contents may contain any byte, so they are matched first
            (State::StringContents(bytes, length), _) => {
                bytes.push(byte);
                if bytes.len() == *length {
                    let string = std::mem::take(bytes);
                    self.emit(Value::String(string))?;
                }
            }

            // Integer
            (State::Ready, b'i') => {
                self.state = State::Integer {
                    negative: false,
                    value: None,
                };
            }
            (State::Integer { negative, value: None }, b'-') if !*negative => {
                *negative = true;
            }
            (State::Integer { negative: true, value: None }, b'0') => {
                return Err(malformed("negative zero not allowed"));
            }
            (State::Integer { value: Some(0), .. }, b'0'..=b'9') => {
                return Err(malformed("leading zeros not allowed"));
            }
            (State::Integer { negative, value }, b'0'..=b'9') => {
                let digit = (byte - b'0') as i64;
                let next = value
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|integer| {
                        if *negative {
                            integer.checked_sub(digit)
                        } else {
                            integer.checked_add(digit)
                        }
                    })
                    .ok_or_else(|| malformed("integer overflow"))?;
                *value = Some(next);
            }
            (&mut State::Integer {
                value: Some(integer),
                ..
            }, b'e') => {
                self.emit(Value::Integer(integer))?;
            }

            // List
            (State::Ready, b'l') => {
                self.push(StackState::List(Vec::new()), position)?;
            }

            // Dictionary
            (State::Ready, b'd') => {
                self.push(StackState::Dictionary(None, Vec::new()), position)?;
            }

            // String
            (State::Ready, b'0'..=b'9') => {
                self.state = State::StringLength((byte - b'0') as usize);
            }
            (State::StringLength(0), b'0'..=b'9') => {
                return Err(malformed("leading zeros not allowed in string length"));
            }
            (State::StringLength(length), b'0'..=b'9') => {
                let digit = (byte - b'0') as usize;
                *length = length
                    .checked_mul(10)
                    .and_then(|length| length.checked_add(digit))
                    .ok_or_else(|| malformed("string length overflow"))?;
            }
            (&mut State::StringLength(length), b':') => {
                if length == 0 {
                    self.emit(Value::String(Vec::new()))?;
                } else {
                    let string = Vec::with_capacity(length.min(MAX_PREALLOCATION));
                    self.state = State::StringContents(string, length);
                }
            }

            // End collection
            (State::Ready, b'e') => match self.stack.pop() {
                Some(StackState::List(list)) => {
                    self.emit(Value::List(list))?;
                }
                Some(StackState::Dictionary(None, entries)) => {
                    self.emit(Value::Dictionary(entries))?;
                }
                Some(StackState::Dictionary(Some(_), _)) => {
                    return Err(malformed("dictionary key without a value"));
                }
                None => {
                    return Err(malformed("nothing to close"));
                }
            },

            // Ignore trailing whitespace
            (State::Done(_), b'\n' | b'\r' | b' ' | b'\t') => (),

            (State::Done(_), _) => {
                return Err(malformed("trailing data after value"));
            }

            // Unexpected input
            _ => {
                return Err(malformed(&format!("unexpected byte 0x{byte:02x}")));
            }
        }
        self.position += 1;
        Ok(())
    }

    fn push(&mut self, collection: StackState, position: usize) -> Result<(), Error> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Error::Malformed {
                position,
                reason: format!("nesting deeper than {}", MAX_DEPTH),
            });
        }
        self.stack.push(collection);
        Ok(())
    }

    fn emit(&mut self, value: Value) -> Result<(), Error> {
        match (self.stack.last_mut(), value) {
            (Some(StackState::List(list)), value) => {
                list.push(value);
            }
            (Some(StackState::Dictionary(key @ None, _)), Value::String(string)) => {
                *key = Some(string);
            }
            (Some(StackState::Dictionary(None, _)), _) => {
                return Err(Error::Malformed {
                    position: self.position,
                    reason: "only string keys are allowed in dictionaries".to_string(),
                });
            }
            (Some(StackState::Dictionary(key, entries)), value) => {
                if let Some(key) = key.take() {
                    entries.push((key, value));
                }
            }
            (None, value) => {
                self.state = State::Done(value);
                return Ok(());
            }
        }
        self.state = State::Ready;
        Ok(())
    }

    pub fn result(self) -> Result<Value, Error> {
        match self.state {
            State::Done(value) => Ok(value),
            _ => Err(Error::Incomplete),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Parser {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for byte in buf {
            self.consume(*byte)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TryFrom<&[u8]> for Value {
    type Error = Error;

    fn try_from(input: &[u8]) -> Result<Self, Self::Error> {
        let mut parser = Parser::new();
        for byte in input {
            parser.consume(*byte)?;
        }
        parser.result()
    }
}

use crate::bencoding::Value;

impl Value {
    /// Appends the canonical encoding of this value. Dictionary entries are written in the order
    /// they are stored, which for decoded values is the order they were read in.
    pub fn encode(&self, dest: &mut Vec<u8>) {
        match self {
            Self::String(string) => encode_string(string, dest),
            Self::Integer(integer) => {
                dest.extend_from_slice(format!("i{}e", integer).as_bytes());
            }
            Self::List(values) => {
                dest.push(b'l');
                for value in values {
                    value.encode(dest);
                }
                dest.push(b'e');
            }
            Self::Dictionary(entries) => {
                dest.push(b'd');
                for (key, value) in entries {
                    encode_string(key, dest);
                    value.encode(dest);
                }
                dest.push(b'e');
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer);
        buffer
    }
}

fn encode_string(string: &[u8], dest: &mut Vec<u8>) {
    dest.extend_from_slice(format!("{}:", string.len()).as_bytes());
    dest.extend_from_slice(string);
}

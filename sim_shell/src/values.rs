use mem_sim::DataType;

/// Encodes one command token as the little-endian bytes of an element.
///
/// Char takes the first byte of the token; the numeric types parse the
/// whole token. `None` marks a token the type cannot represent.
pub fn encode_value(data_type: DataType, token: &str) -> Option<Vec<u8>> {
    let bytes = match data_type {
        DataType::FreeSpace => return None,
        DataType::Char => vec![*token.as_bytes().first()?],
        DataType::Short => token.parse::<i16>().ok()?.to_le_bytes().to_vec(),
        DataType::Int => token.parse::<i32>().ok()?.to_le_bytes().to_vec(),
        DataType::Float => token.parse::<f32>().ok()?.to_le_bytes().to_vec(),
        DataType::Long => token.parse::<i64>().ok()?.to_le_bytes().to_vec(),
        DataType::Double => token.parse::<f64>().ok()?.to_le_bytes().to_vec(),
    };
    Some(bytes)
}

/// Formats one element read back from physical memory.
///
/// Matches the printf conversions of the value printer: `%c` for char,
/// decimal for the integer types, six fractional digits for float and
/// double.
pub fn format_element(data_type: DataType, bytes: &[u8]) -> String {
    match data_type {
        DataType::FreeSpace => String::new(),
        DataType::Char => (bytes[0] as char).to_string(),
        DataType::Short => i16::from_le_bytes([bytes[0], bytes[1]]).to_string(),
        DataType::Int => i32::from_le_bytes(bytes[..4].try_into().unwrap()).to_string(),
        DataType::Float => format!("{:.6}", f32::from_le_bytes(bytes[..4].try_into().unwrap())),
        DataType::Long => i64::from_le_bytes(bytes[..8].try_into().unwrap()).to_string(),
        DataType::Double => format!("{:.6}", f64::from_le_bytes(bytes[..8].try_into().unwrap())),
    }
}

#[cfg(test)]
mod test {
    use mem_sim::DataType;

    use super::{encode_value, format_element};

    #[test]
    fn test_char_takes_first_byte_of_token() {
        assert_eq!(encode_value(DataType::Char, "hello"), Some(vec![b'h']));
        assert_eq!(encode_value(DataType::Char, ""), None);
    }

    #[test]
    fn test_numeric_round_trips() {
        let short = encode_value(DataType::Short, "-321").unwrap();
        assert_eq!(format_element(DataType::Short, &short), "-321");

        let int = encode_value(DataType::Int, "123456").unwrap();
        assert_eq!(format_element(DataType::Int, &int), "123456");

        let long = encode_value(DataType::Long, "-9876543210").unwrap();
        assert_eq!(format_element(DataType::Long, &long), "-9876543210");
    }

    #[test]
    fn test_floats_print_six_fractional_digits() {
        let float = encode_value(DataType::Float, "3.5").unwrap();
        assert_eq!(format_element(DataType::Float, &float), "3.500000");

        let double = encode_value(DataType::Double, "-0.25").unwrap();
        assert_eq!(format_element(DataType::Double, &double), "-0.250000");
    }

    #[test]
    fn test_unparseable_tokens_are_rejected() {
        assert_eq!(encode_value(DataType::Int, "twelve"), None);
        assert_eq!(encode_value(DataType::Short, "70000"), None);
        assert_eq!(encode_value(DataType::Double, ""), None);
    }

    #[test]
    fn test_encoded_width_matches_element_size() {
        for data_type in [
            DataType::Char,
            DataType::Short,
            DataType::Int,
            DataType::Float,
            DataType::Long,
            DataType::Double,
        ] {
            let bytes = encode_value(data_type, "1").unwrap();
            assert_eq!(bytes.len() as u32, data_type.element_size());
        }
    }
}

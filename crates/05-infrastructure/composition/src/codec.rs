//! 共享的 JSON 编解码器

use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON 编解码器，作为基础绑定提供给所有实现
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输出带缩进的 JSON
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Head {
        name: String,
        texture: u32,
    }

    #[test]
    fn test_encode_and_decode() {
        let codec = JsonCodec::new();
        let head = Head {
            name: "steve".to_string(),
            texture: 7,
        };

        let text = codec.encode(&head).unwrap();
        assert_eq!(text, r#"{"name":"steve","texture":7}"#);
        assert_eq!(codec.decode::<Head>(&text).unwrap(), head);
        assert!(JsonCodec::pretty().encode(&head).unwrap().contains('\n'));
        assert!(codec.decode::<Head>("{").is_err());
    }
}

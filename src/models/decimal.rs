//! 请求体中的十进制数量/单价
//!
//! JSON 数字按十进制文本解析, 不经过 f64, 以保证 `0.07` 与库中 `0.07` 相等.
//! 同时接受字符串形式 (`"0.07"`).

use bigdecimal::BigDecimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalInput {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalInput {
    fn into_decimal<E: de::Error>(self) -> Result<BigDecimal, E> {
        let text = match self {
            // 未启用 arbitrary_precision 时, Number 以最短可往返形式输出
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        };
        BigDecimal::from_str(text.trim())
            .map_err(|e| E::custom(format!("invalid decimal {:?}: {}", text, e)))
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    DecimalInput::deserialize(deserializer)?.into_decimal()
}

/// `HashMap<String, BigDecimal>` 的值按同样规则解析
pub mod map {
    use super::DecimalInput;
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Deserializer};
    use std::collections::HashMap;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<String, BigDecimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::<String, DecimalInput>::deserialize(deserializer)?
            .into_iter()
            .map(|(name, value)| Ok((name, value.into_decimal()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::str::FromStr;

    #[derive(Deserialize)]
    struct Scalar {
        #[serde(deserialize_with = "super::deserialize")]
        value: BigDecimal,
    }

    #[derive(Deserialize)]
    struct Map {
        #[serde(default, deserialize_with = "super::map::deserialize")]
        values: HashMap<String, BigDecimal>,
    }

    fn parse(json: &str) -> BigDecimal {
        serde_json::from_str::<Scalar>(&format!(r#"{{"value": {}}}"#, json))
            .unwrap()
            .value
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn fractional_numbers_stay_exact() {
        assert_eq!(parse("0.07"), dec("0.07"));
        assert_eq!(parse("99.99"), dec("99.99"));
        assert_eq!(parse("98765.4321"), dec("98765.4321"));
        assert_eq!(parse("0.1"), dec("0.1"));
    }

    #[test]
    fn integers_and_strings_are_accepted() {
        assert_eq!(parse("3"), BigDecimal::from(3));
        assert_eq!(parse("-2"), BigDecimal::from(-2));
        assert_eq!(parse(r#""0.07""#), dec("0.07"));
        assert_eq!(parse(r#"" 12.50 ""#), dec("12.5"));
    }

    #[test]
    fn invalid_text_is_rejected() {
        let err = serde_json::from_str::<Scalar>(r#"{"value": "abc"}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<Scalar>(r#"{"value": true}"#);
        assert!(err.is_err());
    }

    #[test]
    fn map_values_stay_exact() {
        let m: Map =
            serde_json::from_str(r#"{"values": {"Ethanol": 0.07, "Beaker": "3"}}"#).unwrap();
        assert_eq!(m.values.get("Ethanol"), Some(&dec("0.07")));
        assert_eq!(m.values.get("Beaker"), Some(&BigDecimal::from(3)));

        let m: Map = serde_json::from_str("{}").unwrap();
        assert!(m.values.is_empty());
    }
}

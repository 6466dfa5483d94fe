//! Cleanup of model-produced form mappings before they reach the page.

use serde_json::Value;

use crate::width::to_halfwidth;
use crate::{FormField, FormScanResult, SmartFillMapping};

const PASSWORD_LABELS: [&str; 2] = ["密码", "パスワード"];
const EMAIL_LABELS: [&str; 2] = ["邮箱", "メール"];
const PHONE_LABELS: [&str; 3] = ["电话", "電話", "携帯"];
const ZIP_LABELS: [&str; 2] = ["邮编", "郵便"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Password,
    Email,
    Phone,
    Zip,
}

/// Source of locally trusted values that replace whatever the model answered.
///
/// Returning `None` means no local value exists; the sanitizer then falls
/// back to stripping the model's answer.
pub trait CanonicalValues {
    fn password(&mut self) -> Option<String>;
    fn phone(&mut self) -> Option<String>;
}

fn label_matches(label: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| label.contains(keyword))
}

/// Classify a mapping key using its scan metadata.
///
/// Matches are checked in a fixed order (password, email, phone, zip) and
/// the first hit wins, so a field that looks like both a password and an
/// email is treated as a password.
pub fn classify_field(key: &str, meta: Option<&FormField>) -> Option<FieldClass> {
    let key = key.to_lowercase();
    let (field_type, name, label) = match meta {
        Some(field) => (
            field.field_type.to_lowercase(),
            field.name.to_lowercase(),
            field.label.to_lowercase(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    if field_type == "password"
        || key.contains("password")
        || name.contains("password")
        || label_matches(&label, &PASSWORD_LABELS)
    {
        return Some(FieldClass::Password);
    }
    if field_type == "email"
        || key.contains("email")
        || name.contains("email")
        || label_matches(&label, &EMAIL_LABELS)
    {
        return Some(FieldClass::Email);
    }
    if field_type == "tel"
        || key.contains("phone")
        || key.contains("mobile")
        || label_matches(&label, &PHONE_LABELS)
    {
        return Some(FieldClass::Phone);
    }
    if key.contains("zip") || key.contains("postal") || label_matches(&label, &ZIP_LABELS) {
        return Some(FieldClass::Zip);
    }
    None
}

fn ascii_only(value: &str) -> String {
    value.chars().filter(char::is_ascii).collect()
}

fn digits_and_hyphens(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '-')
        .collect()
}

/// Rewrite every string value of `mapping` in place.
///
/// All strings are folded to half-width. Password and phone answers are
/// discarded in favour of `canonical`; emails lose non-ASCII characters and
/// zip codes keep only digits and hyphens. Non-string values are left alone.
pub fn sanitize_form_mapping(
    mapping: &mut SmartFillMapping,
    scan: &FormScanResult,
    canonical: &mut impl CanonicalValues,
) {
    for (key, value) in mapping.iter_mut() {
        let Value::String(text) = value else {
            continue;
        };
        let folded = to_halfwidth(text);
        let cleaned = match classify_field(key, scan.field(key)) {
            Some(FieldClass::Password) => canonical
                .password()
                .unwrap_or_else(|| ascii_only(&folded)),
            Some(FieldClass::Email) => ascii_only(&folded),
            Some(FieldClass::Phone) => canonical
                .phone()
                .unwrap_or_else(|| digits_and_hyphens(&folded)),
            Some(FieldClass::Zip) => digits_and_hyphens(&folded),
            None => folded,
        };
        *text = cleaned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        password: Option<String>,
        phone: Option<String>,
    }

    impl CanonicalValues for Fixed {
        fn password(&mut self) -> Option<String> {
            self.password.clone()
        }

        fn phone(&mut self) -> Option<String> {
            self.phone.clone()
        }
    }

    fn field(id: &str, field_type: &str, label: &str) -> FormField {
        FormField {
            id: id.to_string(),
            field_type: field_type.to_string(),
            label: label.to_string(),
            ..FormField::default()
        }
    }

    fn scan() -> FormScanResult {
        FormScanResult {
            fields: vec![
                field("f1", "password", ""),
                field("f2", "text", "メールアドレス"),
                field("f3", "text", "携帯電話"),
                field("f4", "text", "郵便番号"),
                field("f5", "text", "氏名"),
            ],
            ..FormScanResult::default()
        }
    }

    fn mapping(pairs: &[(&str, Value)]) -> SmartFillMapping {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn passwords_and_phones_are_forced_to_canonical_values() {
        let mut map = mapping(&[
            ("f1", Value::from("ｐａｓｓ１２３")),
            ("f3", Value::from("090-1234-0000")),
        ]);
        let mut canonical = Fixed {
            password: Some("Xy7$kLm2pQ9!".into()),
            phone: Some("080-3928-4719".into()),
        };
        sanitize_form_mapping(&mut map, &scan(), &mut canonical);
        assert_eq!(map["f1"], "Xy7$kLm2pQ9!");
        assert_eq!(map["f3"], "080-3928-4719");
    }

    #[test]
    fn emails_and_zips_are_stripped() {
        let mut map = mapping(&[
            ("f2", Value::from("ｔａｒｏ＠ｅｘａｍｐｌｅ．ｊｐ（仮）")),
            ("f4", Value::from("〒１００－０００１")),
            ("f5", Value::from("山田　太郎")),
        ]);
        let mut canonical = Fixed {
            password: None,
            phone: None,
        };
        sanitize_form_mapping(&mut map, &scan(), &mut canonical);
        assert_eq!(map["f2"], "taro@example.jp()");
        assert_eq!(map["f4"], "100-0001");
        assert_eq!(map["f5"], "山田 太郎");
    }

    #[test]
    fn missing_canonical_values_fall_back_to_stripping() {
        let mut map = mapping(&[
            ("f1", Value::from("ｐａｓｓ密码")),
            ("f3", Value::from("+81 (90) 1111")),
        ]);
        let mut canonical = Fixed {
            password: None,
            phone: None,
        };
        sanitize_form_mapping(&mut map, &scan(), &mut canonical);
        assert_eq!(map["f1"], "pass");
        assert_eq!(map["f3"], "81901111");
    }

    #[test]
    fn non_string_values_are_untouched() {
        let mut map = mapping(&[("agree", Value::Bool(true)), ("skip", Value::Null)]);
        let mut canonical = Fixed {
            password: None,
            phone: None,
        };
        sanitize_form_mapping(&mut map, &scan(), &mut canonical);
        assert_eq!(map["agree"], Value::Bool(true));
        assert_eq!(map["skip"], Value::Null);
    }

    #[test]
    fn first_matching_class_wins() {
        let both = FormField {
            id: "x".into(),
            field_type: "email".into(),
            name: "password_email".into(),
            ..FormField::default()
        };
        assert_eq!(classify_field("x", Some(&both)), Some(FieldClass::Password));
        assert_eq!(classify_field("mobile_no", None), Some(FieldClass::Phone));
        assert_eq!(classify_field("postalCode", None), Some(FieldClass::Zip));
        assert_eq!(classify_field("company", None), None);
    }
}

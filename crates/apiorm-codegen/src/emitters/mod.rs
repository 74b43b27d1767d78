pub mod factory;
pub mod model;

use minijinja::Environment;

use crate::error::GenerateError;

pub(crate) const MODEL_TEMPLATE: &str = "model.php.j2";
pub(crate) const FACTORY_TEMPLATE: &str = "factory.php.j2";

/// Template environment shared by the PHP emitters.
pub(crate) fn environment() -> Result<Environment<'static>, GenerateError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_filter("php", php_string);
    env.add_template(MODEL_TEMPLATE, include_str!("../../templates/model.php.j2"))?;
    env.add_template(FACTORY_TEMPLATE, include_str!("../../templates/factory.php.j2"))?;
    Ok(env)
}

/// Escape text for a single-quoted PHP string.
pub fn php_string(value: String) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render a JSON value as a PHP literal.
pub fn php_literal(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", php_string(s.clone())),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(php_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{}' => {}", php_string(k.clone()), php_literal(v)))
                .collect();
            format!("[{}]", entries.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_php_string_escapes_quotes_and_backslashes() {
        assert_eq!(php_string("it's".to_string()), "it\\'s");
        assert_eq!(php_string("^\\d+$".to_string()), "^\\\\d+$");
    }

    #[test]
    fn test_php_literal() {
        assert_eq!(php_literal(&json!(null)), "null");
        assert_eq!(php_literal(&json!(true)), "true");
        assert_eq!(php_literal(&json!(42)), "42");
        assert_eq!(php_literal(&json!("a'b")), "'a\\'b'");
        assert_eq!(php_literal(&json!([1, "x"])), "[1, 'x']");
        assert_eq!(
            php_literal(&json!({"street": "Main", "no": 1})),
            "['street' => 'Main', 'no' => 1]"
        );
    }

    #[test]
    fn test_templates_compile() {
        let env = environment().unwrap();
        assert!(env.get_template(MODEL_TEMPLATE).is_ok());
        assert!(env.get_template(FACTORY_TEMPLATE).is_ok());
    }
}

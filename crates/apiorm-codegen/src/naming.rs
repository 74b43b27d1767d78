use apiorm_core::config::{GeneratorConfig, NamingConvention};
use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

/// Class name for a model: the configured convention, wrapped in prefix and suffix.
pub fn class_name(model: &str, config: &GeneratorConfig) -> String {
    let base = match config.naming_convention {
        NamingConvention::PascalCase => model.to_upper_camel_case(),
        NamingConvention::SnakeCase => model.to_snake_case(),
        NamingConvention::CamelCase => model.to_lower_camel_case(),
    };
    format!("{}{}{}", config.prefix, base, config.suffix)
}

pub fn model_file(class: &str) -> String {
    format!("{class}.php")
}

pub fn factory_class(class: &str) -> String {
    format!("{class}Factory")
}

pub fn factory_file(class: &str) -> String {
    format!("Factories/{}.php", factory_class(class))
}

/// Split a possibly qualified base class into its `use` import and short name.
/// `Vendor\Orm\ApiModel` → `(Some("Vendor\Orm\ApiModel"), "ApiModel")`.
pub fn split_base_class(base: &str) -> (Option<&str>, &str) {
    let base = base.trim_start_matches('\\');
    match base.rsplit_once('\\') {
        Some((_, short)) => (Some(base), short),
        None => (None, base),
    }
}

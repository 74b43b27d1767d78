use heck::{ToPascalCase, ToSnakeCase};

/// Naive singularization of a trailing plural `s`.
pub fn singularize(word: &str) -> String {
    if word.ends_with("ies") && word.len() > 3 {
        format!("{}y", &word[..word.len() - 3])
    } else if word.ends_with("ses") || word.ends_with("xes") || word.ends_with("zes") {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// `pet-tags` → `PetTag`.
pub fn studly_singular(word: &str) -> String {
    singularize(word).to_pascal_case()
}

/// Foreign key column pointing back at `model`: `PetOwner` → `pet_owner_id`.
pub fn foreign_key_for(model: &str) -> String {
    format!("{}_id", model.to_snake_case())
}

/// Path segments that are not `{param}` placeholders.
pub fn static_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !is_parameter(s))
}

pub fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// Longest prefix of `path` made of static segments: `/users/{id}/posts` → `/users`.
pub fn base_endpoint(path: &str) -> String {
    let prefix: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .take_while(|s| !is_parameter(s))
        .collect();
    format!("/{}", prefix.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("pets"), "pet");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn test_studly_singular() {
        assert_eq!(studly_singular("pets"), "Pet");
        assert_eq!(studly_singular("pet-tags"), "PetTag");
        assert_eq!(studly_singular("order_items"), "OrderItem");
    }

    #[test]
    fn test_foreign_key_for() {
        assert_eq!(foreign_key_for("Pet"), "pet_id");
        assert_eq!(foreign_key_for("PetOwner"), "pet_owner_id");
    }

    #[test]
    fn test_base_endpoint() {
        assert_eq!(base_endpoint("/pets"), "/pets");
        assert_eq!(base_endpoint("/pets/{petId}"), "/pets");
        assert_eq!(base_endpoint("/users/{id}/posts"), "/users");
        assert_eq!(base_endpoint("/api/v1/orders/{id}"), "/api/v1/orders");
        assert_eq!(base_endpoint("/{id}"), "/");
    }

    #[test]
    fn test_static_segments() {
        let segments: Vec<_> = static_segments("/users/{id}/posts").collect();
        assert_eq!(segments, vec!["users", "posts"]);
    }
}

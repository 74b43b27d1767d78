use apiorm_core::error::ModelError;
use apiorm_core::mapping::{CrudVerb, MapperOptions, RelationshipOverride, RelationshipRecord};
use apiorm_core::parse::operation::HttpMethod;
use apiorm_core::parse::parameter::ParameterLocation;
use apiorm_core::{ParsedSchema, Pipeline, PipelineOptions};

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const RELATIONSHIPS: &str = include_str!("fixtures/relationships.yaml");
const CYCLES: &str = include_str!("fixtures/cycles.yaml");
const OPENAPI31: &str = include_str!("fixtures/openapi31.yaml");

fn process(name: &str, input: &str) -> ParsedSchema {
    Pipeline::default()
        .process_str(name, input)
        .expect("fixture should process")
}

#[test]
fn petstore_end_to_end() {
    let parsed = process("petstore.yaml", PETSTORE);
    assert_eq!(parsed.models.names().collect::<Vec<_>>(), vec!["Pet"]);

    let pet = parsed.model("Pet").unwrap();
    assert_eq!(pet.base_endpoint, "/pets");
    let ops: Vec<(&str, CrudVerb)> = pet
        .operations
        .iter()
        .map(|o| (o.operation_id.as_str(), o.verb))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("listPets", CrudVerb::Index),
            ("createPets", CrudVerb::Store),
            ("showPetById", CrudVerb::Show),
        ]
    );
    assert_eq!(pet.schema_refs.iter().collect::<Vec<_>>(), vec!["Pet"]);

    let rules = parsed.rules_for("Pet").unwrap();
    insta::assert_yaml_snapshot!(rules, @r###"
    id:
      - required
      - integer
    name:
      - required
      - string
    tag:
      - nullable
      - string
    "###);
}

#[test]
fn petstore_endpoints() {
    let parsed = process("petstore.yaml", PETSTORE);
    let summary: Vec<(HttpMethod, &str)> = parsed
        .endpoints
        .iter()
        .map(|e| (e.method, e.path.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (HttpMethod::Get, "/pets"),
            (HttpMethod::Post, "/pets"),
            (HttpMethod::Get, "/pets/{petId}"),
        ]
    );

    let show = &parsed.endpoints[2];
    let pet_id = &show.parameters[0];
    assert_eq!(pet_id.location, ParameterLocation::Path);
    assert!(pet_id.required, "path parameters are always required");

    let list = &parsed.endpoints[0];
    assert!(!list.parameters[0].required);
    let body = list.responses["200"]["application/json"].as_array().unwrap();
    assert_eq!(parsed.graph.reference_name(body.items.as_ref().unwrap()), Some("Pet"));
    assert_eq!(parsed.base_url(), Some("http://petstore.swagger.io/v1"));
}

#[test]
fn relationships_round_trip() {
    let parsed = process("relationships.yaml", RELATIONSHIPS);
    let pet = parsed.model("Pet").unwrap();

    let belongs: Vec<&RelationshipRecord> = pet
        .relationships
        .iter()
        .filter(|r| r.kind_name() == "belongsTo")
        .collect();
    assert_eq!(
        belongs,
        vec![&RelationshipRecord::BelongsTo {
            name: "category".to_string(),
            related_model: "Category".to_string(),
            foreign_key: "category_id".to_string(),
            local_key: "id".to_string(),
        }]
    );

    let has_many: Vec<&RelationshipRecord> = pet
        .relationships
        .iter()
        .filter(|r| r.kind_name() == "hasMany")
        .collect();
    assert_eq!(
        has_many,
        vec![&RelationshipRecord::HasMany {
            name: "tags".to_string(),
            related_model: "Tag".to_string(),
            foreign_key: "pet_id".to_string(),
            local_key: "id".to_string(),
        }]
    );

    assert_eq!(
        pet.relationship("owner"),
        Some(&RelationshipRecord::Embedded {
            name: "owner".to_string(),
            properties: vec!["email".to_string(), "phone".to_string()],
        })
    );
}

#[test]
fn relationships_model_grouping() {
    let parsed = process("relationships.yaml", RELATIONSHIPS);
    assert_eq!(
        parsed.models.names().collect::<Vec<_>>(),
        vec!["Pet", "Category"]
    );

    let pet = parsed.model("Pet").unwrap();
    let verbs: Vec<CrudVerb> = pet.operations.iter().map(|o| o.verb).collect();
    assert_eq!(
        verbs,
        vec![CrudVerb::Index, CrudVerb::Store, CrudVerb::Update, CrudVerb::Destroy]
    );
    assert_eq!(pet.operations[2].operation_id, "put_pets__petId");
    assert_eq!(
        pet.schema_refs.iter().collect::<Vec<_>>(),
        vec!["Pet", "NewPet"]
    );
}

#[test]
fn attributes_merge_by_name_last_write_wins() {
    let parsed = process("relationships.yaml", RELATIONSHIPS);
    let pet = parsed.model("Pet").unwrap();
    let names: Vec<&str> = pet.attributes.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "name", "category", "tags", "owner", "status"]);

    let name = pet.attribute("name").unwrap();
    assert!(name.required);
    assert_eq!(name.description.as_deref(), Some("Name given by the owner"));
    assert!(pet.attribute("id").unwrap().read_only);

    let rules = parsed.rules_for("Pet").unwrap();
    assert_eq!(rules.get("name").unwrap(), ["required", "string"]);
    assert_eq!(
        rules.get("status").unwrap(),
        ["nullable", "string", "in:available,pending,sold"]
    );
    assert_eq!(rules.get("tags.*").unwrap(), ["array"]);
}

#[test]
fn relationship_overrides() {
    let mut mapper = MapperOptions::default();
    mapper
        .overrides
        .insert("Pet.category".to_string(), RelationshipOverride::Ignore);
    mapper.overrides.insert(
        "Pet.tags".to_string(),
        RelationshipOverride::HasMany {
            related: "Label".to_string(),
            foreign_key: Some("owner_pet_id".to_string()),
        },
    );
    let pipeline = Pipeline::new(PipelineOptions {
        mapper,
        ..PipelineOptions::default()
    });
    let parsed = pipeline.process_str("relationships.yaml", RELATIONSHIPS).unwrap();
    let pet = parsed.model("Pet").unwrap();

    assert!(pet.relationship("category").is_none());
    assert_eq!(
        pet.relationship("tags"),
        Some(&RelationshipRecord::HasMany {
            name: "tags".to_string(),
            related_model: "Label".to_string(),
            foreign_key: "owner_pet_id".to_string(),
            local_key: "id".to_string(),
        })
    );
}

#[test]
fn cyclic_models_map_and_rule_without_recursing() {
    let parsed = process("cycles.yaml", CYCLES);
    assert_eq!(
        parsed.models.names().collect::<Vec<_>>(),
        vec!["Order", "Category"]
    );

    let category = parsed.model("Category").unwrap();
    assert_eq!(category.base_endpoint, "/categories");
    assert_eq!(category.operations[0].verb, CrudVerb::Show);
    let kinds: Vec<(&str, &str)> = category
        .relationships
        .iter()
        .map(|r| (r.name(), r.kind_name()))
        .collect();
    assert_eq!(kinds, vec![("parent", "belongsTo"), ("children", "hasMany")]);

    let rules = parsed.rules_for("Category").unwrap();
    assert_eq!(rules.get("parent").unwrap(), ["nullable", "array"]);
    assert_eq!(rules.get("children.*").unwrap(), ["array"]);

    let manager = parsed.schema_rules("Manager").unwrap();
    assert_eq!(manager.get("reports").unwrap(), ["nullable", "integer"]);

    let order = parsed.rules_for("Order").unwrap();
    assert_eq!(order.get("id").unwrap(), ["required", "integer"]);
}

#[test]
fn openapi_31_nullable_and_exclusive_bounds() {
    let parsed = process("openapi31.yaml", OPENAPI31);
    let book = parsed.model("Book").unwrap();
    assert_eq!(book.base_endpoint, "/books");

    let rules = parsed.rules_for("Book").unwrap();
    insta::assert_yaml_snapshot!(rules, @r###"
    isbn:
      - required
      - string
      - "regex:/^[0-9-]{10,17}$/"
    title:
      - required
      - nullable
      - string
    pages:
      - nullable
      - integer
      - "gt:0"
    rating:
      - nullable
      - numeric
      - "min:0"
      - "max:5"
      - "multiple_of:0.5"
    published:
      - nullable
      - string
      - date
    "###);
}

#[test]
fn path_level_parameters_merge_with_operation_parameters() {
    let parsed = process("openapi31.yaml", OPENAPI31);
    let get = &parsed.endpoints[0];
    assert_eq!(get.operation_id, "get_books__bookId");

    let params: Vec<(&str, bool)> = get
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.required))
        .collect();
    assert_eq!(params, vec![("bookId", true), ("X-Request-Id", true)]);
    assert_eq!(
        get.parameters[1].schema.as_ref().unwrap().format.as_deref(),
        Some("uuid")
    );

    let patch = &parsed.endpoints[1];
    assert_eq!(patch.method, HttpMethod::Patch);
    assert!(patch.request_body.as_ref().unwrap().contains_key("application/json"));
    assert!(!patch.parameters[1].required);
}

#[test]
fn processing_is_idempotent() {
    let first = process("relationships.yaml", RELATIONSHIPS);
    let second = process("relationships.yaml", RELATIONSHIPS);
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.graph, second.graph);
    assert_eq!(first.endpoints, second.endpoints);
    assert_eq!(first.models, second.models);
    assert_eq!(
        serde_json::to_string(&first.models).unwrap(),
        serde_json::to_string(&second.models).unwrap()
    );
}

#[test]
fn unknown_model_is_invalid_mapping() {
    let parsed = process("petstore.yaml", PETSTORE);
    let err = parsed.rules_for("Dog").unwrap_err();
    assert!(matches!(err, ModelError::InvalidModelMapping(name) if name == "Dog"));
}

#[test]
fn unsupported_version_fails_the_pipeline() {
    let yaml = "openapi: \"2.0\"\ninfo: {title: t, version: \"1\"}\npaths: {}\n";
    let err = Pipeline::default().process_str("old.yaml", yaml).unwrap_err();
    assert!(err.to_string().contains("2.0"));
}

const DOGS: &str = r##"
openapi: 3.0.3
info: { title: Kennel, version: "1" }
paths:
  /dogs:
    post:
      operationId: createDog
      tags: [dogs]
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Dog" }
      responses:
        "201": { description: created }
components:
  schemas:
    Pet:
      type: object
      properties:
        name: { type: string }
        tag: { type: string }
    Dog:
      allOf:
        - $ref: "#/components/schemas/Pet"
      required: [name]
    Strict:
      allOf:
        - $ref: "#/components/schemas/Pet"
        - required: [name]
          properties:
            name: { maxLength: 20 }
    Code:
      maxLength: 5
      pattern: "^[A-Z]+$"
"##;

#[test]
fn all_of_required_sets_reach_rules_and_models() {
    let parsed = process("dogs.yaml", DOGS);

    let dog = parsed.schema_rules("Dog").unwrap();
    assert_eq!(dog.get("name").unwrap(), ["required", "string"]);
    assert_eq!(dog.get("tag").unwrap(), ["nullable", "string"]);

    let model = parsed.rules_for("Dog").unwrap();
    assert_eq!(model.get("name").unwrap(), ["required", "string"]);
    assert!(parsed.model("Dog").unwrap().attributes["name"].required);

    let strict = parsed.schema_rules("Strict").unwrap();
    assert_eq!(strict.get("name").unwrap(), ["required", "string", "max:20"]);
}

#[test]
fn untyped_string_constraints_are_kept() {
    let parsed = process("dogs.yaml", DOGS);
    let id = parsed.graph.find("Code").unwrap();
    let code = parsed.graph.get(id);
    assert_eq!(code.kind_name(), "string");
    assert!(code.extensions.is_empty());
}

//! The course record schema and its per-field normalization rules.
//!
//! Every attribute the registry knows about is one [`FieldSpec`] row in
//! [`COURSE_FIELDS`]: its stable external name, value type, whether the
//! registry requires it, whether registry-side moderation applies, and the
//! [`Coercion`] rule that turns a raw extracted value into the canonical
//! JSON value. Rules are plain data, so each one is testable on its own.
//!
//! The cardinal invariant: a field's `value` is always derived from its raw
//! input by its rule, and empty/absent input yields the type's null
//! representation, never an empty string, list or object. The one
//! structured default is `duration`, which is always
//! `{"code": "week", "value": …}` even when no value is known.

use super::error::CourseDataError;
use crate::extract::RawTeacher;
use serde_json::{json, Map, Value};
use url::Url;

/// Value type of a course field, as the registry models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    StringList,
    Integer,
    Float,
    Structured,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::StringList => "string[]",
            ValueType::Integer => "integer",
            ValueType::Float => "number",
            ValueType::Structured => "structured",
        }
    }
}

/// A raw, pre-coercion field value from one of the two platform sources.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// No source supplied the field.
    Absent,
    /// A single value from the platform catalog (string, number or null).
    Scalar(Value),
    /// Ordered text fragments extracted from the about page.
    Fragments(Vec<String>),
    /// Teacher blocks extracted from the about page.
    Teachers(Vec<RawTeacher>),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Absent => true,
            RawValue::Scalar(value) => value.is_null(),
            RawValue::Fragments(fragments) => fragments.is_empty(),
            RawValue::Teachers(teachers) => teachers.is_empty(),
        }
    }

    /// The raw value viewed as text fragments, for rules that join or take
    /// the first element. A catalog scalar string counts as one fragment.
    fn fragments(&self, field: &str) -> Result<Vec<String>, CourseDataError> {
        match self {
            RawValue::Fragments(fragments) => Ok(fragments.clone()),
            RawValue::Scalar(Value::String(s)) => Ok(vec![s.clone()]),
            _ => Err(CourseDataError::ShapeMismatch {
                field: field.to_string(),
            }),
        }
    }
}

/// Context needed by coercion rules that resolve URLs.
#[derive(Debug, Clone)]
pub struct CoercionContext {
    /// Public base URL of the platform, for making image paths absolute.
    pub platform_base: Url,
}

/// Normalization rule applied to a field's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Raw value passes through: scalars stay scalars, fragments become a
    /// JSON array of strings.
    Identity,
    /// Fragments joined with `"<br>"` (multi-paragraph description).
    JoinBr,
    /// Fragments joined with `"\n"` (one competence per line).
    JoinNewline,
    /// Fragments joined with a single space.
    JoinSpace,
    /// Fragments wrapped `<ul><li>…</li></ul>` (course content outline).
    BulletList,
    /// First fragment parsed as an integer.
    FirstInt,
    /// First fragment parsed as a float.
    FirstFloat,
    /// First fragment parsed as an integer week count, wrapped
    /// `{"code": "week", "value": …}`.
    DurationWeeks,
    /// Controlled vocabulary: language tokens to `"ru"`/`"en"`; unmapped
    /// non-empty tokens become `""`.
    Language,
    /// Controlled vocabulary: yes/no tokens to `"true"`/`"false"`; unmapped
    /// tokens become null. The asymmetry with [`Coercion::Language`] is a
    /// compatibility requirement, not an accident.
    Certificate,
    /// Teacher blocks to `{display_name, image, description}` objects with
    /// image paths resolved against the platform base URL.
    Teachers,
}

impl Coercion {
    /// The value an empty/absent raw input coerces to.
    pub fn null_value(&self) -> Value {
        match self {
            Coercion::DurationWeeks => json!({ "code": "week", "value": null }),
            _ => Value::Null,
        }
    }

    /// Applies the rule. Empty/absent input always yields
    /// [`Coercion::null_value`]; malformed non-empty input is a fatal
    /// [`CourseDataError`].
    pub fn apply(
        &self,
        field: &str,
        raw: &RawValue,
        ctx: &CoercionContext,
    ) -> Result<Value, CourseDataError> {
        if raw.is_empty() {
            return Ok(self.null_value());
        }

        match self {
            Coercion::Identity => Ok(match raw {
                RawValue::Scalar(value) => value.clone(),
                RawValue::Fragments(fragments) => {
                    Value::Array(fragments.iter().cloned().map(Value::String).collect())
                }
                RawValue::Teachers(_) | RawValue::Absent => {
                    return Err(CourseDataError::ShapeMismatch {
                        field: field.to_string(),
                    })
                }
            }),
            Coercion::JoinBr => Ok(Value::String(raw.fragments(field)?.join("<br>"))),
            Coercion::JoinNewline => Ok(Value::String(raw.fragments(field)?.join("\n"))),
            Coercion::JoinSpace => Ok(Value::String(raw.fragments(field)?.join(" "))),
            Coercion::BulletList => Ok(Value::String(format!(
                "<ul><li>{}</li></ul>",
                raw.fragments(field)?.join("</li><li>")
            ))),
            Coercion::FirstInt => Ok(json!(parse_first_int(field, raw)?)),
            Coercion::FirstFloat => {
                let first = first_fragment(field, raw)?;
                let number: f64 = first
                    .trim()
                    .parse()
                    .map_err(|_| CourseDataError::NotNumeric {
                        field: field.to_string(),
                        raw: first.clone(),
                    })?;
                Ok(json!(number))
            }
            Coercion::DurationWeeks => {
                let weeks = parse_first_int(field, raw)?;
                Ok(json!({ "code": "week", "value": weeks }))
            }
            Coercion::Language => {
                let token = first_fragment(field, raw)?;
                let code = match token.as_str() {
                    "Русский" | "ru" | "RU" | "Ru" => "ru",
                    "English" | "en" | "EN" | "En" => "en",
                    _ => "",
                };
                Ok(Value::String(code.to_string()))
            }
            Coercion::Certificate => {
                let token = first_fragment(field, raw)?;
                Ok(match token.as_str() {
                    "Есть" | "Yes" => Value::String("true".to_string()),
                    "Нет" | "No" => Value::String("false".to_string()),
                    _ => Value::Null,
                })
            }
            Coercion::Teachers => {
                let RawValue::Teachers(teachers) = raw else {
                    return Err(CourseDataError::ShapeMismatch {
                        field: field.to_string(),
                    });
                };
                let normalized = teachers
                    .iter()
                    .map(|teacher| normalize_teacher(teacher, ctx))
                    .collect::<Result<Vec<Value>, CourseDataError>>()?;
                Ok(Value::Array(normalized))
            }
        }
    }
}

fn first_fragment(field: &str, raw: &RawValue) -> Result<String, CourseDataError> {
    raw.fragments(field)?
        .into_iter()
        .next()
        .ok_or_else(|| CourseDataError::ShapeMismatch {
            field: field.to_string(),
        })
}

fn parse_first_int(field: &str, raw: &RawValue) -> Result<i64, CourseDataError> {
    let first = first_fragment(field, raw)?;
    first
        .trim()
        .parse()
        .map_err(|_| CourseDataError::NotNumeric {
            field: field.to_string(),
            raw: first.clone(),
        })
}

fn normalize_teacher(
    teacher: &RawTeacher,
    ctx: &CoercionContext,
) -> Result<Value, CourseDataError> {
    let display_name = teacher.display_name.join(" ");
    let image_path =
        teacher
            .image
            .as_deref()
            .ok_or_else(|| CourseDataError::TeacherImageMissing {
                display_name: display_name.clone(),
            })?;
    let image =
        ctx.platform_base
            .join(image_path)
            .map_err(|e| CourseDataError::BadImageUrl {
                path: image_path.to_string(),
                message: e.to_string(),
            })?;
    Ok(json!({
        "display_name": display_name,
        "image": image.as_str(),
        "description": teacher.description.join(" "),
    }))
}

/// Static schema entry for one course attribute.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Stable external-system key.
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
    /// Whether registry-side moderation review applies before publication.
    pub moderated: bool,
    pub coercion: Coercion,
}

/// The full course schema, in the order fields appear in serializations.
pub const COURSE_FIELDS: &[FieldSpec] = &[
    field("title", ValueType::String, true, true, Coercion::Identity),
    field("started_at", ValueType::String, true, false, Coercion::Identity),
    field("finished_at", ValueType::String, false, false, Coercion::Identity),
    field("enrollment_finished_at", ValueType::String, false, false, Coercion::Identity),
    field("image", ValueType::String, true, false, Coercion::Identity),
    field("description", ValueType::String, true, true, Coercion::JoinBr),
    field("competences", ValueType::String, true, true, Coercion::JoinNewline),
    field("requirements", ValueType::StringList, true, true, Coercion::Identity),
    field("content", ValueType::String, true, true, Coercion::BulletList),
    field("external_url", ValueType::String, true, false, Coercion::Identity),
    field("direction", ValueType::StringList, true, false, Coercion::Identity),
    field("institution", ValueType::String, true, false, Coercion::Identity),
    field("duration", ValueType::Structured, true, true, Coercion::DurationWeeks),
    field("lectures", ValueType::Integer, true, true, Coercion::FirstInt),
    field("language", ValueType::String, false, false, Coercion::Language),
    field("cert", ValueType::String, true, false, Coercion::Certificate),
    field("visitors", ValueType::Integer, false, false, Coercion::Identity),
    field("teachers", ValueType::Structured, true, true, Coercion::Teachers),
    field("transfers", ValueType::Structured, false, false, Coercion::Identity),
    field("results", ValueType::String, true, true, Coercion::JoinSpace),
    field("accreditated", ValueType::String, false, false, Coercion::Identity),
    field("hours", ValueType::Integer, false, false, Coercion::Identity),
    field("hours_per_week", ValueType::Integer, false, false, Coercion::Identity),
    field("business_version", ValueType::String, true, false, Coercion::Identity),
    field("promo_url", ValueType::String, false, false, Coercion::Identity),
    field("promo_lang", ValueType::String, false, false, Coercion::Identity),
    field("subtitles_lang", ValueType::String, false, false, Coercion::Identity),
    field("estimation_tools", ValueType::String, false, false, Coercion::Identity),
    field("proctoring_service", ValueType::String, false, false, Coercion::Identity),
    field("sessionid", ValueType::String, false, false, Coercion::Identity),
    field("credits", ValueType::Float, true, false, Coercion::FirstFloat),
    field("proctoring_type", ValueType::String, false, false, Coercion::Identity),
    field("assessment_description", ValueType::String, false, false, Coercion::Identity),
];

const fn field(
    name: &'static str,
    value_type: ValueType,
    required: bool,
    moderated: bool,
    coercion: Coercion,
) -> FieldSpec {
    FieldSpec {
        name,
        value_type,
        required,
        moderated,
        coercion,
    }
}

/// One field of a live course record: schema row plus raw and coerced value.
#[derive(Debug, Clone)]
pub struct CourseField {
    pub spec: &'static FieldSpec,
    pub raw: RawValue,
    pub value: Value,
}

/// A canonical course record: the full schema with per-field values.
///
/// Instantiated fresh per request, populated by [`CourseRecord::assign`],
/// serialized, and dropped. Never persisted.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    fields: Vec<CourseField>,
}

impl CourseRecord {
    /// A record with every field unassigned (each at its null value).
    pub fn new() -> Self {
        let fields = COURSE_FIELDS
            .iter()
            .map(|spec| CourseField {
                spec,
                raw: RawValue::Absent,
                value: spec.coercion.null_value(),
            })
            .collect();
        Self { fields }
    }

    /// Assigns a raw value to the named field, running its coercion rule.
    ///
    /// Returns `Ok(false)` when no field carries that name; merged source
    /// maps routinely contain keys outside the schema, and callers ignore
    /// them.
    pub fn assign(
        &mut self,
        name: &str,
        raw: RawValue,
        ctx: &CoercionContext,
    ) -> Result<bool, CourseDataError> {
        let Some(course_field) = self.fields.iter_mut().find(|f| f.spec.name == name) else {
            return Ok(false);
        };
        course_field.value = course_field.spec.coercion.apply(name, &raw, ctx)?;
        course_field.raw = raw;
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&CourseField> {
        self.fields.iter().find(|f| f.spec.name == name)
    }

    pub fn fields(&self) -> &[CourseField] {
        &self.fields
    }

    /// Canonical JSON object: exactly the fields whose coerced value is
    /// non-null, keyed by field name, in schema order.
    pub fn to_json_value(&self) -> Value {
        let mut object = Map::new();
        for field in &self.fields {
            if !field.value.is_null() {
                object.insert(field.spec.name.to_string(), field.value.clone());
            }
        }
        Value::Object(object)
    }

    /// Canonical JSON as a string.
    pub fn to_json_string(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Plain nested mapping of all fields with their metadata, for template
    /// rendering.
    pub fn to_map(&self) -> Value {
        let mut object = Map::new();
        for field in &self.fields {
            object.insert(
                field.spec.name.to_string(),
                json!({
                    "name": field.spec.name,
                    "valuetype": field.spec.value_type.as_str(),
                    "required": field.spec.required,
                    "moderated": field.spec.moderated,
                    "value": field.value,
                }),
            );
        }
        Value::Object(object)
    }
}

impl Default for CourseRecord {
    fn default() -> Self {
        Self::new()
    }
}

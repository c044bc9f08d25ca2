//! Provider response validation.
//!
//! Raw provider text becomes a typed [`Decision`] or an error -- nothing
//! in between. Parsing tries several recovery strategies for the ways
//! models mangle JSON (prose around a code block, trailing commas), but
//! the action set itself is closed: an unknown action tag is an error,
//! and the queue routes every error to the rule fallback.

use hearth_types::{ActionParameters, AgentId, Decision, Emotion, ItemKind, Place, ShopId, SiteId};
use uuid::Uuid;

use crate::error::RunnerError;

/// Raw shape of a provider response before validation.
#[derive(Debug, serde::Deserialize)]
struct RawResponse {
    action: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
}

/// Parse raw provider text into a validated [`Decision`].
///
/// Strategies, in order: direct JSON parse; extraction from a markdown
/// code block; trailing-comma stripping; code block extraction plus
/// comma stripping.
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] when every strategy fails or the
/// payload names an unknown action, item, place, or malformed ID.
pub fn parse_decision(raw: &str) -> Result<Decision, RunnerError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<RawResponse>(trimmed) {
        return convert(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<RawResponse>(json_str)
    {
        return convert(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<RawResponse>(&cleaned) {
        return convert(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(json_str);
        if let Ok(parsed) = serde_json::from_str::<RawResponse>(&cleaned_inner) {
            return convert(parsed);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

fn convert(raw: RawResponse) -> Result<Decision, RunnerError> {
    let parameters = build_parameters(&raw.action, &raw.parameters)?;
    Ok(Decision {
        parameters,
        rationale: raw.rationale,
        emotion: raw.emotion.as_deref().map(parse_emotion),
    })
}

/// Unknown moods degrade to neutral; the mood tag is decorative and not
/// worth failing a whole decision over.
fn parse_emotion(s: &str) -> Emotion {
    match s.to_lowercase().as_str() {
        "happy" => Emotion::Happy,
        "sad" => Emotion::Sad,
        "angry" => Emotion::Angry,
        "excited" => Emotion::Excited,
        _ => Emotion::Neutral,
    }
}

fn parse_item(s: &str) -> Result<ItemKind, RunnerError> {
    match s.to_lowercase().as_str() {
        "bread" => Ok(ItemKind::Bread),
        "berry" | "berries" => Ok(ItemKind::Berry),
        "fish" => Ok(ItemKind::Fish),
        "wheat" => Ok(ItemKind::Wheat),
        "copperore" | "copper_ore" | "copper" => Ok(ItemKind::CopperOre),
        "ironore" | "iron_ore" | "iron" => Ok(ItemKind::IronOre),
        "gemstone" | "gem" => Ok(ItemKind::Gemstone),
        other => Err(RunnerError::Parse(format!("unknown item: {other}"))),
    }
}

fn parse_place(s: &str) -> Result<Place, RunnerError> {
    match s.to_lowercase().as_str() {
        "home" => Ok(Place::Home),
        "townsquare" | "town_square" | "square" => Ok(Place::TownSquare),
        "market" => Ok(Place::Market),
        "farm" => Ok(Place::Farm),
        "mine" => Ok(Place::Mine),
        "fishingpier" | "fishing_pier" | "pier" => Ok(Place::FishingPier),
        "tavern" => Ok(Place::Tavern),
        "forest" => Ok(Place::Forest),
        other => Err(RunnerError::Parse(format!("unknown place: {other}"))),
    }
}

fn required_str<'a>(
    params: &'a serde_json::Value,
    field: &str,
    action: &str,
) -> Result<&'a str, RunnerError> {
    params
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| RunnerError::Parse(format!("{action} requires string '{field}'")))
}

fn required_uuid(
    params: &serde_json::Value,
    field: &str,
    action: &str,
) -> Result<Uuid, RunnerError> {
    let raw = required_str(params, field, action)?;
    Uuid::parse_str(raw).map_err(|e| RunnerError::Parse(format!("invalid {field} UUID: {e}")))
}

fn required_quantity(params: &serde_json::Value, action: &str) -> Result<u32, RunnerError> {
    let raw = params
        .get("quantity")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| RunnerError::Parse(format!("{action} requires integer 'quantity'")))?;
    u32::try_from(raw).map_err(|_err| RunnerError::Parse("quantity out of range".to_owned()))
}

fn build_parameters(
    action: &str,
    params: &serde_json::Value,
) -> Result<ActionParameters, RunnerError> {
    match action.to_lowercase().as_str() {
        "eat" => Ok(ActionParameters::Eat {
            item: parse_item(required_str(params, "item", "eat")?)?,
        }),
        "move" => Ok(ActionParameters::Move {
            destination: parse_place(required_str(params, "destination", "move")?)?,
        }),
        "mine" => Ok(ActionParameters::Mine {
            site: SiteId::from(required_uuid(params, "site", "mine")?),
        }),
        "fish" => Ok(ActionParameters::Fish {
            site: SiteId::from(required_uuid(params, "site", "fish")?),
        }),
        "sell" => Ok(ActionParameters::Sell {
            shop: ShopId::from(required_uuid(params, "shop", "sell")?),
            item: parse_item(required_str(params, "item", "sell")?)?,
            quantity: required_quantity(params, "sell")?,
        }),
        "buy" => Ok(ActionParameters::Buy {
            shop: ShopId::from(required_uuid(params, "shop", "buy")?),
            item: parse_item(required_str(params, "item", "buy")?)?,
            quantity: required_quantity(params, "buy")?,
        }),
        "talk" => Ok(ActionParameters::Talk {
            target: AgentId::from(required_uuid(params, "target", "talk")?),
            message: params
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("")
                .to_owned(),
        }),
        "idle" | "none" | "wait" => Ok(ActionParameters::Idle),
        other => Err(RunnerError::Parse(format!("unknown action: {other}"))),
    }
}

/// Extract the body of the first markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```json").map(|i| {
        let after_tag = i.checked_add(7).unwrap_or(i);
        text.get(after_tag..)
            .and_then(|s| s.find('\n'))
            .and_then(|nl| after_tag.checked_add(nl))
            .and_then(|pos| pos.checked_add(1))
            .unwrap_or(after_tag)
    }).or_else(|| {
        text.find("```").map(|i| {
            let after_tag = i.checked_add(3).unwrap_or(i);
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
    });

    let start = start?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets (a common
/// model error). String literals are tracked so a `,}` inside a quoted
/// value is left alone.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < len {
        let c = chars.get(i).copied().unwrap_or(' ');
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i = i.checked_add(1).unwrap_or(len);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let mut j = i.checked_add(1).unwrap_or(i);
            while j < len && chars.get(j).copied().unwrap_or(' ').is_whitespace() {
                j = j.checked_add(1).unwrap_or(j);
            }
            let next = chars.get(j).copied().unwrap_or(' ');
            if next == '}' || next == ']' {
                i = i.checked_add(1).unwrap_or(i);
                continue;
            }
        }
        result.push(c);
        i = i.checked_add(1).unwrap_or(len);
    }

    result
}

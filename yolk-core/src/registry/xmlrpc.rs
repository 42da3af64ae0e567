//! XML-RPC request encoding and response decoding
//!
//! Only what the registry's search method needs: strings, numbers,
//! booleans, nil, arrays and structs. A `<fault>` response becomes a
//! `RegistryUnavailable` error carrying the fault string.

use quick_xml::escape::escape;

use super::xml::{self, Element};
use crate::error::{Result, YolkError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Double(f64),
    Nil,
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn member(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Struct member rendered as text; nil and missing members are empty
    pub fn member_text(&self, key: &str) -> String {
        match self.member(key) {
            Some(Value::Str(s)) => s.clone(),
            Some(Value::Int(i)) => i.to_string(),
            Some(Value::Double(d)) => d.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

/// Encode a `<methodCall>` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Str(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Int(i) => out.push_str(&format!("<int>{i}</int>")),
        Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::Nil => out.push_str("<nil/>"),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `<methodResponse>` into its parameters
pub fn decode_response(body: &str) -> Result<Vec<Value>> {
    let root = xml::parse(body, "XML-RPC response")?;
    if root.name != "methodResponse" {
        return Err(YolkError::registry(format!(
            "expected methodResponse, got <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .map(decode_value)
            .transpose()?
            .unwrap_or(Value::Nil);
        return Err(YolkError::registry(format!(
            "XML-RPC fault {}: {}",
            value.member_text("faultCode"),
            value.member_text("faultString")
        )));
    }

    let Some(params) = root.child("params") else {
        return Ok(Vec::new());
    };

    params
        .children_named("param")
        .map(|param| {
            param
                .child("value")
                .ok_or_else(|| YolkError::registry("XML-RPC param without value"))
                .and_then(decode_value)
        })
        .collect()
}

fn decode_value(value: &Element) -> Result<Value> {
    let Some(typed) = value.children.first() else {
        // Untyped <value> is a string
        return Ok(Value::Str(value.text.clone()));
    };

    let text = typed.text.trim();
    let invalid = |kind: &str| YolkError::registry(format!("invalid XML-RPC {kind}: {text:?}"));

    match typed.name.as_str() {
        "string" => Ok(Value::Str(typed.text.clone())),
        "int" | "i4" | "i8" => text.parse().map(Value::Int).map_err(|_| invalid("int")),
        "boolean" => match text {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        "double" => text.parse().map(Value::Double).map_err(|_| invalid("double")),
        "nil" => Ok(Value::Nil),
        "dateTime.iso8601" | "base64" => Ok(Value::Str(text.to_string())),
        "array" => typed
            .child("data")
            .map(|data| {
                data.children_named("value")
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        "struct" => typed
            .children_named("member")
            .map(|member| {
                let name = member.child_text("name");
                let value = member
                    .child("value")
                    .map(decode_value)
                    .transpose()?
                    .unwrap_or(Value::Nil);
                Ok((name, value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Struct),
        other => Err(YolkError::registry(format!(
            "unsupported XML-RPC type <{other}>"
        ))),
    }
}

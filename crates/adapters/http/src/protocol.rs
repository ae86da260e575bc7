//! Wire format of the hub's `/domo/` endpoint.
//!
//! Every request is a JSON object posted as the `command` form field. Session
//! requests (`sl_registration_req`, `sl_keep_alive_req`, `sl_logout_req`)
//! stand alone; everything else is wrapped in an `sl_data_req` envelope whose
//! `sl_appl_msg` carries the application command.

use domosync_app::ports::Credentials;
use domosync_domain::category::Category;
use domosync_domain::command::HubCommand;
use domosync_domain::error::{DomoError, ProtocolError};
use serde_json::{Map, Value, json};

/// Path of the single endpoint every request is posted to.
pub const ENDPOINT_PATH: &str = "/domo/";

/// Form field carrying the serialized request.
pub const FORM_FIELD: &str = "command";

const ACK_REASON: &str = "sl_data_ack_reason";
const CLIENT_ID: &str = "sl_client_id";
const APPL_MSG: &str = "sl_appl_msg";

#[must_use]
pub fn login_request(credentials: &Credentials) -> Value {
    json!({
        "sl_cmd": "sl_registration_req",
        "sl_login": credentials.username,
        "sl_pwd": credentials.password(),
    })
}

#[must_use]
pub fn keep_alive_request(client_id: &str) -> Value {
    json!({ "sl_cmd": "sl_keep_alive_req", CLIENT_ID: client_id })
}

#[must_use]
pub fn logout_request(client_id: &str) -> Value {
    json!({ "sl_cmd": "sl_logout_req", CLIENT_ID: client_id })
}

/// Wrap `command` in a data envelope with sequence number `cseq`.
#[must_use]
pub fn data_request(client_id: &str, cseq: u64, command: &HubCommand) -> Value {
    let mut message = Map::new();
    message.insert("client".into(), client_id.into());
    message.insert("cmd_name".into(), command_name(command).into());
    message.insert("cseq".into(), cseq.into());
    message.extend(command_params(command));

    json!({
        "sl_cmd": "sl_data_req",
        CLIENT_ID: client_id,
        "sl_appl_msg_type": "domo",
        APPL_MSG: message,
    })
}

/// Hub name of the application command.
#[must_use]
pub fn command_name(command: &HubCommand) -> &'static str {
    match command {
        HubCommand::ListFeatures => "feature_list_req",
        HubCommand::List { category } => match category {
            Category::Light => "nested_light_list_req",
            Category::Relay => "relays_list_req",
            Category::Thermo => "thermo_list_req",
            Category::Sensor => "analogin_list_req",
        },
        HubCommand::Switch { is_light: true, .. } => "light_switch_req",
        HubCommand::Switch { is_light: false, .. } => "relay_activation_req",
        HubCommand::ThermoMode { .. } => "thermo_zone_config_req",
        HubCommand::ChangeSeason { .. } => "thermo_season_req",
    }
}

fn command_params(command: &HubCommand) -> Map<String, Value> {
    let params = match command {
        HubCommand::ListFeatures => json!({}),
        HubCommand::List {
            category: Category::Light,
        } => json!({ "topologic_scope": "plant", "value": 0 }),
        HubCommand::List { .. } => json!({}),
        HubCommand::Switch { remote_id, on, .. } => json!({
            "act_id": remote_id.get(),
            "wanted_status": u8::from(*on),
        }),
        HubCommand::ThermoMode {
            remote_id,
            mode,
            setpoint,
        } => json!({
            "act_id": remote_id.get(),
            "mode": mode.code(),
            "set_point": setpoint.to_tenths(),
            "extended_infos": 0,
        }),
        HubCommand::ChangeSeason { season } => json!({ "season": season.as_str() }),
    };
    match params {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn ack_reason(response: &Value) -> Result<i64, ProtocolError> {
    match response.get(ACK_REASON) {
        Some(value) => value.as_i64().ok_or(ProtocolError::UnexpectedType {
            field: ACK_REASON,
            expected: "an integer",
        }),
        None => Err(ProtocolError::MissingField(ACK_REASON)),
    }
}

/// Extract the client id from a registration answer.
///
/// # Errors
///
/// [`DomoError::Auth`] when the hub refuses the credentials,
/// [`DomoError::Protocol`] when the answer is malformed.
pub fn parse_login(response: &Value) -> Result<String, DomoError> {
    if ack_reason(response)? != 0 {
        return Err(DomoError::Auth);
    }
    response
        .get(CLIENT_ID)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::MissingField(CLIENT_ID).into())
}

/// Check a keep-alive answer.
///
/// # Errors
///
/// [`DomoError::SessionExpired`] on a non-zero ack reason.
pub fn parse_keep_alive(response: &Value) -> Result<(), DomoError> {
    if ack_reason(response)? != 0 {
        return Err(DomoError::SessionExpired);
    }
    Ok(())
}

/// Unwrap the application message of a data answer.
///
/// # Errors
///
/// [`DomoError::SessionExpired`] on a non-zero envelope ack reason,
/// [`DomoError::Protocol`] when the message is missing or the hub rejected
/// the command itself.
pub fn parse_data(response: &Value) -> Result<Value, DomoError> {
    if ack_reason(response)? != 0 {
        return Err(DomoError::SessionExpired);
    }
    let message = response
        .get(APPL_MSG)
        .ok_or(ProtocolError::MissingField(APPL_MSG))?;
    if let Some(reason) = message.get("ack_reason").and_then(Value::as_i64)
        && reason != 0
    {
        return Err(ProtocolError::Rejected(reason).into());
    }
    Ok(message.clone())
}

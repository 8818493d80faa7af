/// Commands a battle participant sends to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// /data NAME (species or move lookup)
    Data(String),

    /// /choose move SLOT
    ChooseMove { slot: usize, rqid: Option<u64> },

    /// /switch SLOT
    Switch { slot: usize, rqid: Option<u64> },

    /// /forfeit
    Forfeit,

    /// /savereplay
    SaveReplay,

    /// /timer on|off
    Timer(bool),

    /// Raw command for catch-all
    Raw(String),
}

impl ClientCommand {
    /// Serialize command to protocol format
    pub fn to_protocol_string(&self) -> String {
        match self {
            Self::Data(name) => format!("/data {}", name),
            Self::ChooseMove { slot, rqid } => with_rqid(format!("/choose move {}", slot), *rqid),
            Self::Switch { slot, rqid } => with_rqid(format!("/switch {}", slot), *rqid),
            Self::Forfeit => "/forfeit".to_string(),
            Self::SaveReplay => "/savereplay".to_string(),
            Self::Timer(on) => format!("/timer {}", if *on { "on" } else { "off" }),
            Self::Raw(command) => command.clone(),
        }
    }

    /// The bare command name, used for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::ChooseMove { .. } => "choose",
            Self::Switch { .. } => "switch",
            Self::Forfeit => "forfeit",
            Self::SaveReplay => "savereplay",
            Self::Timer(_) => "timer",
            Self::Raw(_) => "raw",
        }
    }
}

fn with_rqid(choice: String, rqid: Option<u64>) -> String {
    match rqid {
        Some(id) => format!("{}|{}", choice, id),
        None => choice,
    }
}

/// Client message with optional room context
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub room_id: Option<String>,
    pub command: ClientCommand,
}

impl ClientMessage {
    pub fn in_room(room_id: impl Into<String>, command: ClientCommand) -> Self {
        Self {
            room_id: Some(room_id.into()),
            command,
        }
    }

    /// Serialize to wire format: ROOMID|TEXT or |TEXT
    pub fn to_wire_format(&self) -> String {
        let text = self.command.to_protocol_string();
        match &self.room_id {
            Some(room) => format!("{}|{}", room, text),
            None => format!("|{}", text),
        }
    }
}

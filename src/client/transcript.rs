//! Conversation state shared by the terminal client.
//!
//! Mirrors the browser page: completed turns, one streaming buffer for the
//! assistant turn being received, and an in-flight guard that turns a second
//! submit into a no-op.

/// Text of the synthetic turn appended when a request fails.
pub const ERROR_TURN_TEXT: &str = "Error al procesar la respuesta.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "Usuario",
            Self::Assistant => "Asistente",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub is_error: bool,
}

#[derive(Debug, Default)]
pub struct ChatTranscript {
    turns: Vec<Turn>,
    streaming: String,
    in_flight: bool,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Partial assistant text received so far.
    pub fn streaming(&self) -> &str {
        &self.streaming
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Start a request for `input`.
    ///
    /// Returns the trimmed message to send, or `None` when the input is blank
    /// or another request is still streaming. Nothing changes in that case.
    pub fn begin_submit(&mut self, input: &str) -> Option<String> {
        let message = input.trim();
        if message.is_empty() || self.in_flight {
            return None;
        }
        self.turns.push(Turn {
            role: Role::User,
            content: message.to_string(),
            is_error: false,
        });
        self.streaming.clear();
        self.in_flight = true;
        Some(message.to_string())
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        if self.in_flight {
            self.streaming.push_str(chunk);
        }
    }

    /// Move the streaming buffer into a completed assistant turn.
    pub fn finish(&mut self) -> Option<&Turn> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.turns.push(Turn {
            role: Role::Assistant,
            content: std::mem::take(&mut self.streaming),
            is_error: false,
        });
        self.turns.last()
    }

    /// Drop the partial answer and record the error turn instead.
    pub fn fail(&mut self) -> Option<&Turn> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.streaming.clear();
        self.turns.push(Turn {
            role: Role::Assistant,
            content: ERROR_TURN_TEXT.to_string(),
            is_error: true,
        });
        self.turns.last()
    }

    pub fn clear(&mut self) {
        if !self.in_flight {
            self.turns.clear();
        }
    }
}

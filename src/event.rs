use crate::source::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MouseDown,
    MouseUp,
    MouseMove,
    Click,
    AuxClick,
    TouchStart,
    TouchMove,
    TouchEnd,
    KeyDown,
    KeyUp,
    Input,
    Change,
}

impl EventKind {
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            EventKind::MouseDown
                | EventKind::MouseUp
                | EventKind::MouseMove
                | EventKind::Click
                | EventKind::AuxClick
        )
    }

    pub fn is_touch(self) -> bool {
        matches!(
            self,
            EventKind::TouchStart | EventKind::TouchMove | EventKind::TouchEnd
        )
    }

    pub fn is_key(self) -> bool {
        matches!(self, EventKind::KeyDown | EventKind::KeyUp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<(f32, f32)> for Point {
    fn from(value: (f32, f32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Pointer { button: u8, point: Point },
    Touch { id: u32, point: Point },
    Key { code: String },
    Value(String),
}

/// A low-level input event delivered to the listeners of its target node.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub payload: EventPayload,
}

impl InputEvent {
    pub fn mouse(kind: EventKind, target: NodeId, button: u8, point: impl Into<Point>) -> Self {
        Self {
            kind,
            target,
            payload: EventPayload::Pointer {
                button,
                point: point.into(),
            },
        }
    }

    /// Primary-button click at the origin of `target`.
    pub fn click(target: NodeId) -> Self {
        Self::mouse(EventKind::Click, target, 0, (0.0, 0.0))
    }

    pub fn touch(kind: EventKind, target: NodeId, id: u32, point: impl Into<Point>) -> Self {
        Self {
            kind,
            target,
            payload: EventPayload::Touch {
                id,
                point: point.into(),
            },
        }
    }

    pub fn key(kind: EventKind, target: NodeId, code: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            payload: EventPayload::Key { code: code.into() },
        }
    }

    pub fn value(kind: EventKind, target: NodeId, value: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            payload: EventPayload::Value(value.into()),
        }
    }

    pub fn point(&self) -> Option<Point> {
        match &self.payload {
            EventPayload::Pointer { point, .. } | EventPayload::Touch { point, .. } => Some(*point),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<u8> {
        match &self.payload {
            EventPayload::Pointer { button, .. } => Some(*button),
            _ => None,
        }
    }

    pub fn touch_id(&self) -> Option<u32> {
        match &self.payload {
            EventPayload::Touch { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn key_code(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Key { code } => Some(code),
            _ => None,
        }
    }
}

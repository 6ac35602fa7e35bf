// Slot tables for fields and their controllers.
//
// Both collections are append-only `Vec<Option<T>>`: an entity's id is the
// index it was pushed at, and removing it leaves a `None` tombstone. Ids are
// therefore strictly increasing within a collection and never handed out
// twice for the life of the process. Sessions are short-lived and a slot
// costs one word once vacated, so the tables are not compacted.
//
// The registry holds no connections or sockets, only `ConnectionId`s. All
// emitting and cascading lives in `coordinator.rs`.

use remote_pong_protocol::{ControllerId, FieldId, GameType, Side};

use crate::transport::ConnectionId;

/// Whether a field still accepts controller registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldStatus {
    Open,
    Closed,
}

/// A connected phone acting as a paddle.
#[derive(Clone, Debug, PartialEq)]
pub struct Controller {
    pub connection: ConnectionId,
    /// Assigned once, at game start.
    pub side: Option<Side>,
    /// Last raw input reported by the controller.
    pub direction: f64,
}

/// A game display and the controllers attached to it.
#[derive(Debug)]
pub struct Field {
    pub connection: ConnectionId,
    pub status: FieldStatus,
    pub game_type: GameType,
    controllers: Vec<Option<Controller>>,
}

impl Field {
    fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            status: FieldStatus::Open,
            game_type: GameType::default(),
            controllers: Vec::new(),
        }
    }

    /// Append a controller and return its slot id.
    pub fn add_controller(&mut self, connection: ConnectionId) -> ControllerId {
        let id = ControllerId(self.controllers.len() as u32);
        self.controllers.push(Some(Controller {
            connection,
            side: None,
            direction: 0.0,
        }));
        id
    }

    /// Vacate a controller slot. Returns the removed controller, or `None` if
    /// the slot was already vacant or never existed.
    pub fn remove_controller(&mut self, id: ControllerId) -> Option<Controller> {
        self.controllers.get_mut(id.0 as usize)?.take()
    }

    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        self.controllers.get(id.0 as usize)?.as_ref()
    }

    pub fn controller_mut(&mut self, id: ControllerId) -> Option<&mut Controller> {
        self.controllers.get_mut(id.0 as usize)?.as_mut()
    }

    /// Live controllers in slot order.
    pub fn controllers(&self) -> impl Iterator<Item = (ControllerId, &Controller)> {
        self.controllers
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (ControllerId(i as u32), c)))
    }

    /// Live controllers in slot order, mutably.
    pub fn controllers_mut(&mut self) -> impl Iterator<Item = (ControllerId, &mut Controller)> {
        self.controllers
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|c| (ControllerId(i as u32), c)))
    }

    pub fn live_controller_count(&self) -> usize {
        self.controllers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Vacate every controller slot, returning the live controllers in slot
    /// order. The slot count is kept so later registrations still get fresh
    /// ids.
    pub fn take_controllers(&mut self) -> Vec<(ControllerId, Controller)> {
        self.controllers
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.take().map(|c| (ControllerId(i as u32), c)))
            .collect()
    }
}

/// All fields known to the relay.
#[derive(Debug, Default)]
pub struct Registry {
    fields: Vec<Option<Field>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an open field owned by `connection` and return its slot id.
    pub fn add_field(&mut self, connection: ConnectionId) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Some(Field::new(connection)));
        id
    }

    /// Vacate a field slot. Returns the removed field (with whatever
    /// controllers it still held), or `None` if already vacant.
    pub fn remove_field(&mut self, id: FieldId) -> Option<Field> {
        self.fields.get_mut(id.0 as usize)?.take()
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0 as usize)?.as_ref()
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn live_field_count(&self) -> usize {
        self.fields.iter().filter(|slot| slot.is_some()).count()
    }
}

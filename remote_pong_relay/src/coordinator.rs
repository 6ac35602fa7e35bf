// Session coordinator: the relay's only stateful component.
//
// `Coordinator` owns the `Registry` and a `Transport`, and turns every inbound
// `ClientMessage` (plus connection-closed events) into registry mutations and
// outbound `ServerMessage`s. It is driven by the server's single main-loop
// thread, one event at a time, so each handler's read-modify-write of the
// registry is atomic without any locking.
//
// Connections start unidentified. `new_field` or a successful
// `new_controller` records a role for the connection in `roles`; that entry
// is what ties the connection's close event to the matching teardown:
// - field closes: every live controller gets `error(field_disconnected)`, then
//   all of them are disconnected and their slots vacated.
// - controller closes: its slot is vacated and the field is told
//   `controller_disconnected`.
//
// Teardown removes the role entry first, so a second close event for the same
// connection (e.g. the TCP reader noticing a socket the coordinator already
// shut down) is a no-op. Dropping a connection from inside a handler (losing a
// round, referencing an unknown field) runs the teardown immediately rather
// than waiting for the transport's close event; the round-end pass depends on
// the loser being gone before it counts survivors.
//
// Ids arrive as `Option`s: `None` is a client value that names no slot, and
// it takes the same path as an unknown id (`field_not_exists` for fields, a
// silent drop for controllers).

use std::collections::HashMap;

use remote_pong_protocol::{
    ClientMessage, ControllerId, ErrorCode, FieldId, GameType, ServerMessage, Side,
};
use tracing::{debug, trace, warn};

use crate::direction;
use crate::error::RegistrationError;
use crate::registry::{FieldStatus, Registry};
use crate::transport::{ConnectionId, Transport};

/// What an identified connection is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Field(FieldId),
    Controller(FieldId, ControllerId),
}

pub struct Coordinator<T: Transport> {
    registry: Registry,
    roles: HashMap<ConnectionId, Role>,
    transport: T,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            registry: Registry::new(),
            roles: HashMap::new(),
            transport,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Dispatch one message received on `connection`.
    pub fn handle_message(&mut self, connection: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::NewField => self.new_field(connection),
            ClientMessage::Start { game_type } => self.start(connection, game_type),
            ClientMessage::NewController { field_id } => self.new_controller(connection, field_id),
            ClientMessage::Win { field_id, side } => self.win(connection, field_id, side),
            ClientMessage::Direction {
                field_id,
                controller_id,
                side,
                direction,
            } => self.direction(connection, field_id, controller_id, side, direction),
        }
    }

    /// Tear down whatever `connection` was registered as. Safe to call for
    /// unidentified or already torn-down connections.
    pub fn handle_disconnect(&mut self, connection: ConnectionId) {
        match self.roles.remove(&connection) {
            Some(Role::Field(field_id)) => {
                debug!(%field_id, %connection, "field disconnected");
                self.remove_field(field_id);
            }
            Some(Role::Controller(field_id, controller_id)) => {
                self.remove_controller(field_id, controller_id);
            }
            None => trace!(%connection, "close of unregistered connection"),
        }
    }

    // --- Session lifecycle ---

    fn new_field(&mut self, connection: ConnectionId) {
        if let Some(role) = self.roles.get(&connection) {
            warn!(%connection, ?role, "new_field from an identified connection ignored");
            return;
        }
        let field_id = self.registry.add_field(connection);
        self.roles.insert(connection, Role::Field(field_id));
        debug!(%field_id, %connection, "new field");
        self.transport
            .emit(connection, &ServerMessage::FieldRegistered { field_id });
    }

    fn start(&mut self, connection: ConnectionId, game_type: GameType) {
        let Some(Role::Field(field_id)) = self.roles.get(&connection).copied() else {
            warn!(%connection, "start from a non-field connection ignored");
            return;
        };
        let Some(field) = self.registry.field_mut(field_id) else {
            return;
        };
        if field.status == FieldStatus::Closed {
            warn!(%field_id, "start on an already started field ignored");
            return;
        }

        field.game_type = game_type;
        field.status = FieldStatus::Closed;
        debug!(%field_id, sides = game_type.side_count(), "game started");

        for (index, (_, controller)) in field.controllers_mut().enumerate() {
            let side = game_type.side_for(index as u32);
            controller.side = Some(side);
            self.transport
                .emit(controller.connection, &ServerMessage::Start { side });
        }
    }

    fn new_controller(&mut self, connection: ConnectionId, field_id: Option<FieldId>) {
        if let Some(role) = self.roles.get(&connection) {
            warn!(%connection, ?role, "new_controller from an identified connection ignored");
            return;
        }
        match self.register_controller(connection, field_id) {
            Ok((field_id, controller_id)) => {
                debug!(%field_id, %controller_id, %connection, "controller registered");
            }
            Err(err) => {
                debug!(%connection, %err, "controller registration rejected");
                self.reject(connection, err.code());
            }
        }
    }

    fn register_controller(
        &mut self,
        connection: ConnectionId,
        field_id: Option<FieldId>,
    ) -> Result<(FieldId, ControllerId), RegistrationError> {
        let field_id = field_id.ok_or(RegistrationError::UnusableFieldId)?;
        let field = self
            .registry
            .field_mut(field_id)
            .ok_or(RegistrationError::FieldNotExists(field_id))?;
        if field.status != FieldStatus::Open {
            return Err(RegistrationError::FieldClosed(field_id));
        }

        let controller_id = field.add_controller(connection);
        let field_connection = field.connection;
        self.roles
            .insert(connection, Role::Controller(field_id, controller_id));
        self.transport
            .emit(connection, &ServerMessage::ControllerRegistered { controller_id });
        self.transport
            .emit(field_connection, &ServerMessage::ControllerConnected);
        Ok((field_id, controller_id))
    }

    /// Vacate a field and cascade to its controllers. Returns false if the
    /// field was already gone.
    fn remove_field(&mut self, field_id: FieldId) -> bool {
        let Some(mut field) = self.registry.remove_field(field_id) else {
            return false;
        };
        let controllers = field.take_controllers();

        let notice = ServerMessage::error(ErrorCode::FieldDisconnected);
        for (_, controller) in &controllers {
            self.transport.emit(controller.connection, &notice);
        }
        for (_, controller) in &controllers {
            self.roles.remove(&controller.connection);
            self.transport.disconnect(controller.connection);
        }
        debug!(%field_id, controllers = controllers.len(), "field deleted with its controllers");
        true
    }

    /// Vacate a controller slot and tell its field. Returns false if the
    /// controller (or its field) was already gone.
    fn remove_controller(&mut self, field_id: FieldId, controller_id: ControllerId) -> bool {
        let Some(field) = self.registry.field_mut(field_id) else {
            return false;
        };
        let Some(controller) = field.remove_controller(controller_id) else {
            return false;
        };
        self.roles.remove(&controller.connection);
        self.transport
            .emit(field.connection, &ServerMessage::ControllerDisconnected);
        debug!(%field_id, %controller_id, "controller disconnected and removed");
        true
    }

    /// Close `connection` and run its teardown now.
    fn drop_connection(&mut self, connection: ConnectionId) {
        self.transport.disconnect(connection);
        self.handle_disconnect(connection);
    }

    /// Send a protocol error, then drop the connection.
    fn reject(&mut self, connection: ConnectionId, code: ErrorCode) {
        self.transport.emit(connection, &ServerMessage::error(code));
        self.drop_connection(connection);
    }

    // --- Relay rules ---

    fn win(&mut self, connection: ConnectionId, field_id: Option<FieldId>, side: Option<Side>) {
        debug!(?field_id, ?side, "round end");
        let Some((field_id, field)) =
            field_id.and_then(|id| Some((id, self.registry.field(id)?)))
        else {
            self.reject(connection, ErrorCode::FieldNotExists);
            return;
        };

        // A side that names nothing matches nobody, so every controller loses.
        let standings: Vec<(ConnectionId, bool)> = field
            .controllers()
            .map(|(_, c)| (c.connection, side.is_some() && c.side == side))
            .collect();
        for (controller_connection, won) in standings {
            self.transport
                .emit(controller_connection, &ServerMessage::RoundEnd { won });
            if !won {
                self.drop_connection(controller_connection);
            }
        }

        let Some(field) = self.registry.field(field_id) else {
            return;
        };
        let mut survivors = field.controllers();
        if let (Some((controller_id, last)), None) = (survivors.next(), survivors.next()) {
            debug!(%field_id, %controller_id, "game won");
            self.transport.emit(field.connection, &ServerMessage::Winner);
            self.transport.emit(last.connection, &ServerMessage::Winner);
        }
    }

    // --- Direction aggregator ---

    fn direction(
        &mut self,
        connection: ConnectionId,
        field_id: Option<FieldId>,
        controller_id: Option<ControllerId>,
        side: Option<Side>,
        raw_direction: f64,
    ) {
        let Some(field) = field_id.and_then(|id| self.registry.field_mut(id)) else {
            self.reject(connection, ErrorCode::FieldNotExists);
            return;
        };
        let Some(controller) = controller_id.and_then(|id| field.controller_mut(id)) else {
            trace!(?field_id, ?controller_id, "direction for a vacated controller dropped");
            return;
        };
        controller.direction = raw_direction;

        let Some(side) = side else {
            trace!(?field_id, ?controller_id, "direction without a usable side");
            return;
        };
        let consensus = direction::consensus(
            field
                .controllers()
                .filter(|(_, c)| c.side == Some(side))
                .map(|(_, c)| c.direction),
        );
        self.transport.emit(
            field.connection,
            &ServerMessage::Direction {
                side,
                direction: consensus,
            },
        );
    }
}

use std::fmt;

/// The payload of an outgoing `Message::Mode` message. This is
/// narrower than the controller's internal operating-mode state
/// machine (`boiler_controller::OperatingMode`): `READY` never
/// appears on the wire as a `MODE` message (it announces itself with
/// `ProgramReady` instead), so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Initialisation,
    Normal,
    Degraded,
    Rescue,
    EmergencyStop,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Mode::Initialisation => "INITIALISATION",
            Mode::Normal => "NORMAL",
            Mode::Degraded => "DEGRADED",
            Mode::Rescue => "RESCUE",
            Mode::EmergencyStop => "EMERGENCY_STOP",
        };
        write!(f, "{}", name)
    }
}

/// One message crossing the boundary between the controller and the
/// plant. Variants carry their own payload directly rather than a
/// separate `kind` tag plus an untyped parameter, which is both more
/// idiomatic and lets the compiler check that every producer/consumer
/// handles the payload type it expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // -- from the plant --
    Level(f64),
    Steam(f64),
    PumpState(usize, bool),
    PumpControlState(usize, bool),
    BoilerWaiting,
    PhysicalUnitsReady,
    PumpRepaired(usize),
    PumpControlRepaired(usize),
    LevelRepaired,
    SteamRepaired,

    // -- to the plant --
    Mode(Mode),
    ProgramReady,
    OpenPump(usize),
    ClosePump(usize),
    Valve,
    PumpFailureDetection(usize),
    PumpControlFailureDetection(usize),
    SteamFailureDetection,
    LevelFailureDetection,
    PumpRepairedAck(usize),
    PumpControlRepairedAck(usize),
    SteamRepairedAck,
    LevelRepairedAck,
}

/// The incoming batch for one tick. Read-only and borrowed for the
/// duration of the call; `size`/`read` mirror the host's mailbox
/// abstraction so any indexable, read-only buffer of messages can
/// stand in without an adapter.
pub trait Inbox {
    fn size(&self) -> usize;
    fn read(&self, i: usize) -> &Message;
}

impl<T: AsRef<[Message]>> Inbox for T {
    fn size(&self) -> usize {
        self.as_ref().len()
    }

    fn read(&self, i: usize) -> &Message {
        &self.as_ref()[i]
    }
}

/// The outgoing batch for one tick. Append-only.
pub trait Outbox {
    fn send(&mut self, msg: Message);
}

impl Outbox for Vec<Message> {
    fn send(&mut self, msg: Message) {
        self.push(msg);
    }
}

//! TWI (I2C) slave receiver protocol.
//!
//! The device accepts exactly one command byte per bus transaction and
//! never has anything to say back. The hardware reports each bus event as a
//! status code; [`Event::decode`] turns that into an [`Event`] and
//! [`transition`] maps (state, event) to the next state and the action the
//! interrupt handler has to carry out. Nothing in here touches registers.

use crate::mailbox::Mailbox;

/// Mask for the status bits of TWSR (drops the prescaler bits).
pub const TW_STATUS_MASK: u8 = 0xF8;

// TWI slave status codes
pub const TW_BUS_ERROR: u8 = 0x00;
pub const TW_SR_SLA_ACK: u8 = 0x60; // own SLA+W received, ACK returned
pub const TW_SR_DATA_ACK: u8 = 0x80; // data received, ACK returned
pub const TW_SR_DATA_NACK: u8 = 0x88; // data received, NACK returned
pub const TW_SR_STOP: u8 = 0xA0; // stop or repeated start while addressed
pub const TW_ST_SLA_ACK: u8 = 0xA8; // own SLA+R received, ACK returned
pub const TW_ST_DATA_ACK: u8 = 0xB8; // data transmitted, ACK received
pub const TW_ST_DATA_NACK: u8 = 0xC0; // data transmitted, NACK received
pub const TW_ST_LAST_DATA: u8 = 0xC8; // last data transmitted, ACK received

/// Byte clocked out on every read request.
pub const NO_DATA: u8 = 0xFF;

/// A decoded bus event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    AddressedAsReceiver,
    DataReceived(u8),
    DataNacked,
    Stop,
    /// The master wants a byte (address or data phase of a read).
    ReadRequested,
    /// The master finished reading.
    ReadDone,
    BusError,
    /// A status this slave can never legitimately see (master modes,
    /// general call, arbitration).
    Unexpected(u8),
}

impl Event {
    /// Decode a raw TWSR value. `data` is only called for a received byte.
    pub fn decode(status: u8, data: impl FnOnce() -> u8) -> Self {
        match status & TW_STATUS_MASK {
            TW_SR_SLA_ACK => Event::AddressedAsReceiver,
            TW_SR_DATA_ACK => Event::DataReceived(data()),
            TW_SR_DATA_NACK => Event::DataNacked,
            TW_SR_STOP => Event::Stop,
            TW_ST_SLA_ACK | TW_ST_DATA_ACK => Event::ReadRequested,
            TW_ST_DATA_NACK | TW_ST_LAST_DATA => Event::ReadDone,
            TW_BUS_ERROR => Event::BusError,
            other => Event::Unexpected(other),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Waiting to be addressed; acknowledging.
    Listening,
    /// Addressed for writing, the command byte is next.
    Receiving,
    /// The command byte was taken; further bytes get a NACK.
    Rejecting,
    /// Addressed for reading.
    Transmitting,
}

/// What the interrupt handler must do for an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Acknowledge and keep listening.
    Ack,
    /// Offer the byte to the mailbox, then NACK the rest of the transaction.
    Capture(u8),
    /// Load the data register with the byte and acknowledge.
    Transmit(u8),
    /// Release the bus by forcing a stop condition.
    RecoverBus,
    /// Protocol violation carrying the raw status.
    Fatal(u8),
}

/// How the TWI control register must be written back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Ack,
    Nack,
    Transmit(u8),
    RecoverBus,
}

/// The full (state, event) -> (action, next state) table.
pub fn transition(state: State, event: Event) -> (Action, State) {
    match event {
        Event::AddressedAsReceiver => (Action::Ack, State::Receiving),
        Event::DataReceived(byte) => (Action::Capture(byte), State::Rejecting),
        // A NACKed byte ends the transaction; the next start gets an ACK again.
        Event::DataNacked => (Action::Ack, State::Listening),
        Event::Stop => (Action::Ack, State::Listening),
        Event::ReadRequested => (Action::Transmit(NO_DATA), State::Transmitting),
        Event::ReadDone => (Action::Ack, State::Listening),
        Event::BusError => (Action::RecoverBus, State::Listening),
        Event::Unexpected(status) => (Action::Fatal(status), state),
    }
}

/// Slave protocol state owned by the TWI interrupt.
#[derive(Copy, Clone, Debug)]
pub struct BusSlave {
    state: State,
}

impl BusSlave {
    pub const fn new() -> Self {
        Self {
            state: State::Listening,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Run one event through the table, feeding captured bytes into the mailbox.
    /// Returns the raw status as the error on a protocol violation.
    pub fn handle(&mut self, event: Event, mailbox: &Mailbox) -> Result<Control, u8> {
        let (action, next) = transition(self.state, event);
        self.state = next;
        match action {
            Action::Ack => Ok(Control::Ack),
            Action::Capture(byte) => {
                // A full mailbox silently drops the byte.
                mailbox.offer(byte);
                Ok(Control::Nack)
            }
            Action::Transmit(byte) => Ok(Control::Transmit(byte)),
            Action::RecoverBus => Ok(Control::RecoverBus),
            Action::Fatal(status) => Err(status),
        }
    }
}

impl Default for BusSlave {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(slave: &mut BusSlave, mailbox: &Mailbox, status: u8, data: u8) -> Result<Control, u8> {
        slave.handle(Event::decode(status, || data), mailbox)
    }

    #[test]
    fn test_decode_masks_prescaler_bits() {
        assert_eq!(Event::decode(TW_SR_SLA_ACK | 0x03, || 0), Event::AddressedAsReceiver);
        assert_eq!(Event::decode(TW_SR_DATA_ACK | 0x01, || 0x42), Event::DataReceived(0x42));
        assert_eq!(Event::decode(TW_ST_LAST_DATA, || 0), Event::ReadDone);
        assert_eq!(Event::decode(0x08, || 0), Event::Unexpected(0x08));
    }

    #[test]
    fn test_write_transaction_captures_one_byte() {
        let mailbox = Mailbox::new();
        let mut slave = BusSlave::new();

        assert_eq!(feed(&mut slave, &mailbox, TW_SR_SLA_ACK, 0), Ok(Control::Ack));
        assert_eq!(slave.state(), State::Receiving);

        assert_eq!(feed(&mut slave, &mailbox, TW_SR_DATA_ACK, 0x07), Ok(Control::Nack));
        assert_eq!(slave.state(), State::Rejecting);
        assert_eq!(mailbox.peek(), 0x07);

        // Second byte of the same transaction is refused by hardware.
        assert_eq!(feed(&mut slave, &mailbox, TW_SR_DATA_NACK, 0x08), Ok(Control::Ack));
        assert_eq!(slave.state(), State::Listening);
        assert_eq!(mailbox.peek(), 0x07);

        assert_eq!(feed(&mut slave, &mailbox, TW_SR_STOP, 0), Ok(Control::Ack));
        assert_eq!(slave.state(), State::Listening);
    }

    #[test]
    fn test_full_mailbox_drops_new_command() {
        let mailbox = Mailbox::new();
        mailbox.offer(0x03);
        let mut slave = BusSlave::new();

        feed(&mut slave, &mailbox, TW_SR_SLA_ACK, 0).unwrap();
        assert_eq!(feed(&mut slave, &mailbox, TW_SR_DATA_ACK, 0x0F), Ok(Control::Nack));
        assert_eq!(mailbox.peek(), 0x03);
    }

    #[test]
    fn test_reads_return_no_data() {
        let mailbox = Mailbox::new();
        let mut slave = BusSlave::new();

        assert_eq!(feed(&mut slave, &mailbox, TW_ST_SLA_ACK, 0), Ok(Control::Transmit(NO_DATA)));
        assert_eq!(slave.state(), State::Transmitting);
        assert_eq!(feed(&mut slave, &mailbox, TW_ST_DATA_ACK, 0), Ok(Control::Transmit(NO_DATA)));
        assert_eq!(feed(&mut slave, &mailbox, TW_ST_DATA_NACK, 0), Ok(Control::Ack));
        assert_eq!(slave.state(), State::Listening);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_bus_error_mid_transaction() {
        let mailbox = Mailbox::new();
        let mut slave = BusSlave::new();

        feed(&mut slave, &mailbox, TW_SR_SLA_ACK, 0).unwrap();
        feed(&mut slave, &mailbox, TW_SR_DATA_ACK, 0x05).unwrap();
        assert_eq!(feed(&mut slave, &mailbox, TW_BUS_ERROR, 0), Ok(Control::RecoverBus));
        assert_eq!(slave.state(), State::Listening);
        assert_eq!(mailbox.peek(), 0x05);

        // Still usable afterwards.
        assert_eq!(feed(&mut slave, &mailbox, TW_SR_SLA_ACK, 0), Ok(Control::Ack));
    }

    #[test]
    fn test_master_status_is_fatal() {
        let mailbox = Mailbox::new();
        let mut slave = BusSlave::new();
        for status in [0x08, 0x18, 0x38, 0x68, 0x70, 0xB0] {
            assert_eq!(feed(&mut slave, &mailbox, status, 0), Err(status));
        }
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_fatal_keeps_state() {
        assert_eq!(
            transition(State::Receiving, Event::Unexpected(0x18)),
            (Action::Fatal(0x18), State::Receiving)
        );
    }
}

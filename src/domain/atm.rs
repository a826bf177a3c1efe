//! Keypad state machine for the ATM screen.
//!
//! [`transition`] is pure: it maps the current screen and a key press to an
//! [`Effect`] that the orchestrator then carries out against the ledger.

use super::wallet::{DisplayState, EMPTY_ENTRY, MAX_ENTRY_LEN};
use crate::error::{LedgerError, Result};
use std::str::FromStr;

/// The four soft keys around the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Nw,
    Ne,
    Sw,
    Se,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKey {
    Cancel,
    Clear,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Digit(u8),
    Control(ControlKey),
    Action(ActionKey),
}

impl FromStr for ControlKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nw" => Ok(ControlKey::Nw),
            "ne" => Ok(ControlKey::Ne),
            "sw" => Ok(ControlKey::Sw),
            "se" => Ok(ControlKey::Se),
            other => Err(LedgerError::InvalidInput(format!("unknown control key {other}"))),
        }
    }
}

impl FromStr for ActionKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Cancel" => Ok(ActionKey::Cancel),
            "Clear" => Ok(ActionKey::Clear),
            "Enter" => Ok(ActionKey::Enter),
            other => Err(LedgerError::InvalidInput(format!("unknown action key {other}"))),
        }
    }
}

impl KeyInput {
    /// Parses the `(type, key)` pair sent by the keypad.
    pub fn parse(kind: &str, key: &str) -> Result<Self> {
        match kind {
            "digit" => match key.as_bytes() {
                [digit @ b'0'..=b'9'] => Ok(KeyInput::Digit(digit - b'0')),
                _ => Err(LedgerError::InvalidInput(format!("invalid digit {key:?}"))),
            },
            "control" => key.parse().map(KeyInput::Control),
            "action" | "word" => key.parse().map(KeyInput::Action),
            other => Err(LedgerError::InvalidInput(format!("invalid key type {other}"))),
        }
    }
}

/// What a key press asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Ignore,
    Show(DisplayState),
    ResetEntryAndShow(DisplayState),
    ResetEntry,
    AppendDigit(u8),
    /// Move to `confirm` only when the entry is a positive amount.
    ConfirmEntry,
    Withdraw,
    Deposit,
}

pub fn transition(state: DisplayState, key: KeyInput) -> Effect {
    use ActionKey::*;
    use ControlKey::*;
    use DisplayState::*;

    match (state, key) {
        (Initiate | Deposit, KeyInput::Digit(digit)) => Effect::AppendDigit(digit),
        (_, KeyInput::Digit(_)) => Effect::Ignore,

        (Home, KeyInput::Control(Nw)) => Effect::Show(Balance),
        (Home, KeyInput::Control(Ne)) => Effect::ResetEntryAndShow(Initiate),
        (Home, KeyInput::Control(Sw)) => Effect::Show(Activity),
        (Home, KeyInput::Control(Se)) => Effect::ResetEntryAndShow(Deposit),

        (Initiate, KeyInput::Action(Enter)) => Effect::ConfirmEntry,
        (Initiate | Deposit, KeyInput::Action(Clear)) => Effect::ResetEntry,

        (Confirm, KeyInput::Control(Ne) | KeyInput::Action(Enter)) => Effect::Withdraw,
        (Confirm, KeyInput::Control(Se)) => Effect::Show(Home),

        (Deposit, KeyInput::Control(Se) | KeyInput::Action(Enter)) => Effect::Deposit,

        (Balance | Activity, KeyInput::Control(Se) | KeyInput::Action(_)) => Effect::Show(Home),

        (Initiate | Confirm | Deposit, KeyInput::Action(Cancel)) => Effect::Show(Home),

        _ => Effect::Ignore,
    }
}

/// Appends a digit unless the entry is already full.
pub fn append_digit(entry: &str, digit: u8) -> Option<String> {
    (entry.len() < MAX_ENTRY_LEN).then(|| format!("{entry}{digit}"))
}

/// Outcome of moving the debit card between wallet and ATM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardToggle {
    pub debit_card: bool,
    pub display_state: DisplayState,
    pub reset_entry: bool,
}

/// `card_in_wallet == true` inserts the card into the ATM; `false` hands it back.
pub fn toggle_card(card_in_wallet: bool) -> CardToggle {
    if card_in_wallet {
        CardToggle {
            debit_card: false,
            display_state: DisplayState::Home,
            reset_entry: true,
        }
    } else {
        CardToggle {
            debit_card: true,
            display_state: DisplayState::Insert,
            reset_entry: false,
        }
    }
}

/// Entry value after a reset.
pub fn reset_entry() -> String {
    EMPTY_ENTRY.to_string()
}

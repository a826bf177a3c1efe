use crate::application::orchestrator::{TransactionKind, TransactionOrchestrator};
use crate::domain::atm::KeyInput;
use crate::domain::denomination::Denomination;
use crate::domain::exchange::ExchangeKind;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the request stream, tagged by `op`.
///
/// Denominations travel as face values, e.g. `"2.5"` or `"20"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ExchangeBills {
        wallet_id: String,
        denomination: Decimal,
    },
    ExchangeChips {
        wallet_id: String,
        denomination: Decimal,
    },
    ChangeChips {
        wallet_id: String,
        given: Decimal,
        received: Decimal,
    },
    BreakBills {
        wallet_id: String,
        denomination: Decimal,
    },
    AddChip {
        wallet_id: String,
        denomination: Decimal,
    },
    RemoveChip {
        wallet_id: String,
        denomination: Decimal,
    },
    Card {
        atm_id: String,
    },
    Keypad {
        atm_id: String,
        #[serde(rename = "type")]
        kind: String,
        key: String,
    },
    Transaction {
        atm_id: String,
        #[serde(rename = "type")]
        kind: String,
    },
    Wallet {
        wallet_id: String,
    },
    Atm {
        atm_id: String,
    },
}

impl Request {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Row the request addresses.
    pub fn target(&self) -> &str {
        match self {
            Request::ExchangeBills { wallet_id, .. }
            | Request::ExchangeChips { wallet_id, .. }
            | Request::ChangeChips { wallet_id, .. }
            | Request::BreakBills { wallet_id, .. }
            | Request::AddChip { wallet_id, .. }
            | Request::RemoveChip { wallet_id, .. }
            | Request::Wallet { wallet_id } => wallet_id,
            Request::Card { atm_id }
            | Request::Keypad { atm_id, .. }
            | Request::Transaction { atm_id, .. }
            | Request::Atm { atm_id } => atm_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub reason: &'static str,
    pub message: String,
}

/// The envelope written back for every request line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Response {
    pub fn ok<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            success: true,
            data: Some(serde_json::to_value(data)?),
            error: None,
        })
    }

    pub fn failure(err: &LedgerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(Failure {
                reason: err.reason_code(),
                message: err.to_string(),
            }),
        }
    }
}

fn chip(value: Decimal) -> Result<Denomination> {
    Denomination::chip_with_value(value)
        .ok_or_else(|| LedgerError::InvalidInput(format!("unknown chip {value}")))
}

/// Runs one request against the orchestrator.
pub async fn dispatch(
    orchestrator: &TransactionOrchestrator,
    request: Request,
) -> Result<Response> {
    match request {
        Request::ExchangeBills {
            wallet_id,
            denomination,
        } => Response::ok(
            &orchestrator
                .exchange(&wallet_id, ExchangeKind::BillsToChips, denomination, None)
                .await?,
        ),
        Request::ExchangeChips {
            wallet_id,
            denomination,
        } => Response::ok(
            &orchestrator
                .exchange(&wallet_id, ExchangeKind::ChipsToBills, denomination, None)
                .await?,
        ),
        Request::ChangeChips {
            wallet_id,
            given,
            received,
        } => Response::ok(
            &orchestrator
                .exchange(&wallet_id, ExchangeKind::ChipChange, given, Some(received))
                .await?,
        ),
        Request::BreakBills {
            wallet_id,
            denomination,
        } => Response::ok(
            &orchestrator
                .exchange(&wallet_id, ExchangeKind::BillBreak, denomination, None)
                .await?,
        ),
        Request::AddChip {
            wallet_id,
            denomination,
        } => Response::ok(&orchestrator.add_chip(&wallet_id, chip(denomination)?).await?),
        Request::RemoveChip {
            wallet_id,
            denomination,
        } => Response::ok(
            &orchestrator
                .remove_chip(&wallet_id, chip(denomination)?)
                .await?,
        ),
        Request::Card { atm_id } => Response::ok(&orchestrator.toggle_card(&atm_id).await?),
        Request::Keypad { atm_id, kind, key } => {
            let key = KeyInput::parse(&kind, &key)?;
            Response::ok(&orchestrator.press_key(&atm_id, key).await?)
        }
        Request::Transaction { atm_id, kind } => {
            let kind: TransactionKind = kind.parse()?;
            Response::ok(&orchestrator.process_transaction(&atm_id, kind).await?)
        }
        Request::Wallet { wallet_id } => {
            Response::ok(&orchestrator.fetch_wallet(&wallet_id).await?)
        }
        Request::Atm { atm_id } => Response::ok(&orchestrator.fetch_atm(&atm_id).await?),
    }
}

/// Parses and runs one request line. Never fails: every problem becomes a
/// failure envelope.
pub async fn handle_line(orchestrator: &TransactionOrchestrator, line: &str) -> Response {
    let outcome = match Request::parse(line) {
        Ok(request) => dispatch(orchestrator, request).await,
        Err(err) => {
            tracing::warn!(error = %err, "unreadable request");
            Err(err)
        }
    };
    outcome.unwrap_or_else(|err| Response::failure(&err))
}

//! Turns a stream of address edits into a single "address is complete" event.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use dorsal_core::AddressInput;

/// The address form as it currently reads, with the contact email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDraft {
    pub address: AddressInput,
    pub email: String,
}

impl AddressDraft {
    /// Whether the fields shipping options depend on are all filled in.
    ///
    /// This is the trigger only; full validation happens on submit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.address.address_1,
            &self.address.city,
            &self.address.postal_code,
            &self.address.country_code,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Wait until a complete draft has stayed unchanged for `quiet`.
///
/// Incomplete drafts cancel a pending trigger. Re-sending an identical draft
/// does not restart the quiet period. When the sender is dropped, a pending
/// complete draft is returned at once; otherwise `None`.
pub async fn settle_address(
    drafts: &mut mpsc::Receiver<AddressDraft>,
    quiet: Duration,
) -> Option<AddressDraft> {
    let mut settled: Option<AddressDraft> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let received = match deadline {
            Some(at) => tokio::select! {
                received = drafts.recv() => received,
                () = tokio::time::sleep_until(at) => return settled,
            },
            None => drafts.recv().await,
        };

        let Some(draft) = received else {
            return settled;
        };

        if !draft.is_complete() {
            settled = None;
            deadline = None;
        } else if settled.as_ref() != Some(&draft) {
            deadline = Some(Instant::now() + quiet);
            settled = Some(draft);
        }
    }
}

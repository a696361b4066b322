//! Encoding of descriptor states, and a closed-form model of what a program
//! does when it runs to completion.

use anyhow::Context;

use crate::{
    object::PeImage,
    sequencer::{DescriptorState, Weight},
};

macro_rules! define_code {
    {
        @mod $modname:ident;
        @type $typ:ty;
        $( $cname:ident = $cval:expr; )*
    } => {
        pub mod $modname {
            $(pub const $cname : $typ = $cval; )*
            #[allow(unused)]
            pub fn name_of(code: $typ) -> &'static str {
                match code {
                    $($cname => stringify!($cname), )*
                    _ => "no name"
                }
            }
        }
    };
}

define_code! {
    @mod state_code;
    @type u8;
    GENWAIT = 0;
    WAIT = 1;
    SUSPENDED = 2;
}

/// Outcome of a program computed without stepping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardResult {
    /// Number of steps needed to exhaust the program.
    pub ticks: u64,
    /// Weight index after the last descriptor completed.
    pub weight_idx: i64,
    /// Weight exposed at the end, if the index is inside the table.
    pub weight: Option<Weight>,
}

/// Compute the result of running `image` from a freshly loaded state.
///
/// Every descriptor takes `(x_count+1)*(y_count+1)` steps, and a `GenWait`
/// moves the weight index by `y_modify` once per outer iteration. Programs
/// containing a suspended descriptor never finish, so they are rejected.
pub fn simulate(image: &PeImage) -> anyhow::Result<StandardResult> {
    let mut ticks = 0u128;
    let mut weight_idx = 0i64;
    for (i, desc) in image.program.iter().enumerate() {
        match desc.state {
            DescriptorState::Suspended => {
                anyhow::bail!("descriptor {i} is suspended, program never completes")
            }
            DescriptorState::GenWait => {
                weight_idx = desc
                    .y_modify
                    .checked_mul(i64::from(desc.y_count) + 1)
                    .and_then(|delta| weight_idx.checked_add(delta))
                    .with_context(|| format!("weight index overflows at descriptor {i}"))?;
            }
            DescriptorState::Wait => {}
        }
        ticks += desc.ticks();
    }
    let ticks = u64::try_from(ticks).context("program runs for more than u64::MAX ticks")?;
    let weight = usize::try_from(weight_idx)
        .ok()
        .and_then(|i| image.weights.get(i).copied());

    Ok(StandardResult {
        ticks,
        weight_idx,
        weight,
    })
}

// Library root
// ------------
// The `progress` binary (`main.rs`) wires these modules together into an
// interactive session that compares tracked Toggl time with a project's
// hour estimate.
//
// Module responsibilities:
// - `config`: the stored API key and which backend to talk to.
// - `api`: HTTP calls to the progress backend and their JSON shapes.
// - `ui`: terminal prompts, spinner and the progress bar.
// - `report`: hours/percentage/cost arithmetic and input validators.
// - `workflow`: the step-by-step session driving all of the above.
// - `error`: failure types and the messages shown to the user.
// - `logging`: the persistent log sink.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod ui;
pub mod workflow;

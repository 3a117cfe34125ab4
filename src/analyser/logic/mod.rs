pub mod balance;
pub mod estimation;
pub mod flows;
pub mod io;
pub mod selection;
pub mod stats;
pub mod types;

pub use balance::check_balance;
pub use estimation::{
    OlsFit, adjusted_design, difference_in_means, estimate_effects, fit_adjusted, fit_unadjusted,
};
pub use flows::{PipelineOutcome, analyze_frame, balance_flow, missing_flow, run_pipeline};
pub use io::{LoadOptions, SourceLocation, load_df, parse_csv_bytes, save_csv};
pub use selection::{missing_counts, select_variables};
pub use types::{
    AnalysisResults, ArmSummary, BalanceRow, BalanceStats, BalanceTest, Covariate, CovariateKind,
    CovariateValues, EffectEstimate, EffectReport, EstimateKind, LevelCounts, MissingCount,
    ModelFailure, SelectedData, Z_95,
};

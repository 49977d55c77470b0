//! Process-wide initialization; kept in its own binary because it installs globals

use fling_runtime::{default_callback_context, same_context, ImmediateContext, SharedContext};
use fling_sdk::{init, SdkConfig, SdkError};

#[test]
fn test_init_installs_default_context_once() {
    let context: SharedContext = ImmediateContext::shared();

    let bad = SdkConfig {
        position_update_interval_ms: Some(0),
        ..Default::default()
    };
    assert!(matches!(init(&bad, None), Err(SdkError::Config(_))));

    init(&SdkConfig::default(), Some(context.clone())).unwrap();
    assert!(same_context(&default_callback_context(), &context));

    assert!(matches!(
        init(&SdkConfig::default(), Some(ImmediateContext::shared())),
        Err(SdkError::Runtime(_))
    ));
    assert!(init(&SdkConfig::default(), None).is_ok());
}

//! A wrapped input feeding an output, swapped while running

use std::sync::Arc;
use std::time::Duration;

use ferry_config::{GenerateInputConfig, InputConfig};
use ferry_core::{MetricsRegistry, StreamedInput};
use ferry_inputs::{InputWrapper, new_input};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn generate(payload: &str) -> InputConfig {
    InputConfig::Generate(GenerateInputConfig {
        payload: payload.into(),
        interval: Duration::from_millis(5),
        count: 0,
    })
}

#[tokio::test]
async fn test_factory_input_hot_swap() {
    let registry = MetricsRegistry::new();
    let wrapper = InputWrapper::new(new_input(&generate("a0"), &registry).unwrap());
    let rx = wrapper.transactions();
    let cancel = CancellationToken::new();

    let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.payload().get(0).unwrap().data().as_ref(), b"a0");
    first.ack(&cancel, Ok(())).unwrap();

    wrapper.close_existing_input(&cancel).await.unwrap();
    wrapper.swap_input(new_input(&generate("b0"), &registry).unwrap());

    loop {
        let tran = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .expect("outbound closed during swap");
        let is_b0 = tran.payload().get(0).unwrap().data().as_ref() == b"b0";
        let _ = tran.ack(&cancel, Ok(()));
        if is_b0 {
            break;
        }
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    wrapper.close_async();
    wrapper.wait_for_close(Duration::from_secs(1)).await.unwrap();
    assert!(registry.snapshot()["input.generate"].sent >= 2);
}

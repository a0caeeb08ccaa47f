//! Driver contract tests, run against the simulated driver through
//! `Arc<dyn CameraBackend>` exactly as a host would hold it.

mod common;

use common::{fast_options, next_event, next_state, next_status, simulated_backend, wait_for_state};
use landfall_camera::drivers::SimulatedOptions;
use landfall_camera::state::NOT_AVAILABLE;
use landfall_camera::{
    CameraError, CameraEvent, CameraParameter, CameraState, ConnectionState, ParameterValue,
    SlateMetadata,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn default_state_is_unavailable() {
    let state = CameraState::default();
    assert!(!state.recording);
    assert_eq!(state.iso, NOT_AVAILABLE);
    assert_eq!(state.shutter, NOT_AVAILABLE);
    assert_eq!(state.iris, NOT_AVAILABLE);
    assert_eq!(state.white_balance, NOT_AVAILABLE);
    assert_eq!(state.battery_voltage, 0.0);
    assert_eq!(state.battery(), None);
    assert_eq!(state.lens_info, "");
}

#[tokio::test]
async fn disconnect_before_connect_is_a_no_op() {
    let camera = simulated_backend(fast_options());
    let mut rx = camera.subscribe();

    camera.disconnect().await;

    assert_eq!(camera.state(), CameraState::default());
    assert_eq!(camera.connection_state(), ConnectionState::Disconnected);
    assert!(rx.drain().is_empty());
}

#[tokio::test]
async fn connect_reports_link_up() {
    let camera = simulated_backend(fast_options());
    let mut rx = camera.subscribe();

    assert!(camera.connect("192.168.1.50").await);

    let status = next_status(&mut rx).await;
    assert!(status.connected);
    assert!(camera.connection_state().is_connected());
    assert_eq!(camera.state().iso, "400");

    camera.disconnect().await;
}

#[tokio::test]
async fn failed_connect_leaves_nothing_behind() {
    let camera = simulated_backend(SimulatedOptions {
        reject_identifiers: vec!["10.0.0.99".into()],
        ..fast_options()
    });
    let mut rx = camera.subscribe();

    assert!(!camera.connect("10.0.0.99").await);
    camera.disconnect().await;

    let events = rx.drain();
    assert!(events
        .iter()
        .all(|e| !matches!(e, CameraEvent::StateChanged(_))));
    assert!(events
        .iter()
        .filter_map(CameraEvent::as_status)
        .all(|s| !s.connected));
    assert_eq!(camera.state(), CameraState::default());
}

#[tokio::test]
async fn empty_identifier_fails() {
    let camera = simulated_backend(fast_options());
    assert!(!camera.connect("").await);
    assert_eq!(camera.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn start_record_is_confirmed_before_stop() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);
    let mut rx = camera.subscribe();

    camera.start_record().await.unwrap();
    let state = wait_for_state(&mut rx, |s| s.recording).await;
    assert!(state.recording);

    camera.stop_record().await.unwrap();
    wait_for_state(&mut rx, |s| !s.recording).await;

    camera.disconnect().await;
}

#[tokio::test]
async fn record_requires_connection() {
    let camera = simulated_backend(fast_options());
    assert!(matches!(
        camera.start_record().await,
        Err(CameraError::NotConnected)
    ));
    assert!(matches!(
        camera.stop_record().await,
        Err(CameraError::NotConnected)
    ));
}

#[tokio::test]
async fn set_iso_by_name_publishes_snapshot() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);
    let mut rx = camera.subscribe();

    camera.set_parameter_by_name("iso", "800".into()).await.unwrap();

    let state = next_state(&mut rx).await;
    assert_eq!(state.iso, "800");
    assert_eq!(camera.state().iso, "800");

    camera.disconnect().await;
}

#[tokio::test]
async fn unknown_parameter_is_discoverable() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);

    let err = camera
        .set_parameter_by_name("unsupported_param", 1.into())
        .await
        .unwrap_err();
    assert!(matches!(err, CameraError::UnknownParameter(ref name) if name == "unsupported_param"));
    assert!(err.is_parameter_error());

    camera.disconnect().await;
}

#[tokio::test]
async fn capability_gaps_are_rejected_up_front() {
    let camera = simulated_backend(SimulatedOptions {
        supported_parameters: vec![CameraParameter::Iso, CameraParameter::Shutter],
        ..fast_options()
    });
    assert!(!camera.capabilities().supports(CameraParameter::WhiteBalance));
    assert!(camera.connect("192.168.1.50").await);

    let err = camera
        .set_parameter_by_name("wb", "5600K".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CameraError::UnsupportedParameter { .. }));

    camera.disconnect().await;
}

#[tokio::test]
async fn invalid_values_are_rejected() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);

    let cases: [(CameraParameter, ParameterValue); 5] = [
        (CameraParameter::Iso, "fast".into()),
        (CameraParameter::Iso, 1_000_000.into()),
        (CameraParameter::Iris, "f/99".into()),
        (CameraParameter::WhiteBalance, "purple".into()),
        (CameraParameter::Shutter, "".into()),
    ];
    for (param, value) in cases {
        let err = camera.set_parameter(param, value).await.unwrap_err();
        assert!(
            matches!(err, CameraError::InvalidValue { .. }),
            "{} should be rejected, got {:?}",
            param,
            err
        );
    }
    assert_eq!(camera.state().iso, "400");

    camera.disconnect().await;
}

#[tokio::test]
async fn parameters_require_connection() {
    let camera = simulated_backend(fast_options());
    assert!(matches!(
        camera.set_parameter(CameraParameter::Iso, 800.into()).await,
        Err(CameraError::NotConnected)
    ));
}

#[tokio::test]
async fn slate_injection() {
    let camera = simulated_backend(fast_options());
    let slate = SlateMetadata::builder()
        .production("Landfall")
        .scene("12A")
        .take(3)
        .build();

    assert!(matches!(
        camera.inject_metadata(&slate).await,
        Err(CameraError::NotConnected)
    ));

    assert!(camera.connect("192.168.1.50").await);
    camera.inject_metadata(&slate).await.unwrap();
    assert!(matches!(
        camera.inject_metadata(&SlateMetadata::new()).await,
        Err(CameraError::InvalidMetadata(_))
    ));

    camera.disconnect().await;
}

#[tokio::test]
async fn monitor_and_host_events_arrive_in_order() {
    let camera = simulated_backend(SimulatedOptions {
        latency_ms: 1,
        poll_interval_ms: 2,
        battery_volts: 16.0,
        battery_drain_volts: 0.001,
        ..SimulatedOptions::default()
    });
    assert!(camera.connect("192.168.1.50").await);
    let mut rx = camera.subscribe();

    camera.set_parameter(CameraParameter::Iso, 800.into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    camera.set_parameter(CameraParameter::Iso, 1600.into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    camera.disconnect().await;

    let snapshots: Vec<CameraState> = rx
        .drain()
        .into_iter()
        .filter_map(|e| e.as_state().cloned())
        .filter(|s| s.battery().is_some())
        .collect();
    assert!(!snapshots.is_empty());

    // Each snapshot builds on the previous one: battery only drains and ISO
    // never goes back to an earlier setting.
    let rank = |iso: &str| match iso {
        "400" => 0,
        "800" => 1,
        "1600" => 2,
        other => panic!("unexpected iso {}", other),
    };
    for pair in snapshots.windows(2) {
        assert!(pair[1].battery_voltage <= pair[0].battery_voltage);
        assert!(rank(&pair[1].iso) >= rank(&pair[0].iso));
    }
    assert_eq!(snapshots.last().map(|s| s.iso.as_str()), Some("1600"));
}

#[tokio::test]
async fn silent_after_disconnect() {
    let camera = simulated_backend(SimulatedOptions {
        latency_ms: 1,
        poll_interval_ms: 1,
        ..SimulatedOptions::default()
    });
    assert!(camera.connect("192.168.1.50").await);
    camera.start_record().await.unwrap();
    camera.disconnect().await;

    let mut rx = camera.subscribe();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(rx.drain().is_empty());
    assert_eq!(camera.state(), CameraState::default());
    assert_eq!(camera.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_reports_link_down() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);
    let mut rx = camera.subscribe();

    camera.disconnect().await;
    camera.disconnect().await;

    let reset = next_event(&mut rx).await;
    assert_eq!(reset.as_state(), Some(&CameraState::default()));
    let status = next_status(&mut rx).await;
    assert!(!status.connected);
    assert!(rx.drain().is_empty());
}

#[tokio::test]
async fn reconnect_after_disconnect() {
    let camera = simulated_backend(fast_options());
    assert!(camera.connect("192.168.1.50").await);
    camera.disconnect().await;
    assert!(camera.connect("192.168.1.51").await);
    assert_eq!(camera.state().iso, "400");
    camera.disconnect().await;
}

#[tokio::test]
async fn callback_observers_see_events() {
    let camera = simulated_backend(fast_options());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = camera
        .events()
        .connect(move |event| {
            if let Some(status) = event.as_status() {
                sink.lock().unwrap().push(status.connected);
            }
        })
        .unwrap();

    assert!(camera.connect("192.168.1.50").await);
    camera.disconnect().await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    subscription.disconnect();
}

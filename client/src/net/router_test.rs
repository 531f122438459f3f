use super::*;

#[derive(Default)]
struct Tally {
    calls: Vec<&'static str>,
}

fn first(ctx: &mut Tally, _frame: &Frame) -> Result<(), String> {
    ctx.calls.push("first");
    Ok(())
}

fn second(ctx: &mut Tally, _frame: &Frame) -> Result<(), String> {
    ctx.calls.push("second");
    Ok(())
}

fn failing(_ctx: &mut Tally, frame: &Frame) -> Result<(), String> {
    Err(format!("cannot handle {}", frame.event))
}

fn dispatch(router: &EventRouter<Tally, String>, ctx: &mut Tally, frame: &Frame) -> Option<Result<(), String>> {
    let kind = frame.kind()?;
    let handler = router.handler(kind)?;
    Some(handler(ctx, frame))
}

#[test]
fn registered_handler_receives_frame() {
    let mut router: EventRouter<Tally, String> = EventRouter::new();
    assert!(router.on(EventKind::SendMessage, first).is_none());

    let mut ctx = Tally::default();
    let result = dispatch(&router, &mut ctx, &Frame::empty(EventKind::SendMessage));
    assert_eq!(result, Some(Ok(())));
    assert_eq!(ctx.calls, vec!["first"]);
}

#[test]
fn registering_again_replaces_previous_handler() {
    let mut router: EventRouter<Tally, String> = EventRouter::new();
    router.on(EventKind::FileCreated, first);
    assert!(router.on(EventKind::FileCreated, second).is_some());
    assert_eq!(router.len(), 1);

    let mut ctx = Tally::default();
    dispatch(&router, &mut ctx, &Frame::empty(EventKind::FileCreated));
    assert_eq!(ctx.calls, vec!["second"]);
}

#[test]
fn unregistered_and_removed_events_are_not_dispatched() {
    let mut router: EventRouter<Tally, String> = EventRouter::new();
    router.on(EventKind::TypingStart, first);
    assert!(router.off(EventKind::TypingStart).is_some());
    assert!(!router.contains(EventKind::TypingStart));
    assert!(router.is_empty());

    let mut ctx = Tally::default();
    assert!(dispatch(&router, &mut ctx, &Frame::empty(EventKind::TypingStart)).is_none());
    assert!(ctx.calls.is_empty());
}

#[test]
fn handler_errors_are_returned_to_caller() {
    let mut router: EventRouter<Tally, String> = EventRouter::new();
    router.on(EventKind::Error, failing);

    let mut ctx = Tally::default();
    let result = dispatch(&router, &mut ctx, &Frame::empty(EventKind::Error));
    assert_eq!(result, Some(Err("cannot handle error".to_owned())));
}

pub fn send(summary: impl Into<String>, body: impl Into<String>) {
    let summary = summary.into();
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname("snapstamp")
        .summary(&summary)
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}

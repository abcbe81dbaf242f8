//! Connection-info templating
//!
//! Challenge authors declare a connection string with a `{host}` placeholder
//! and `{port:N}` tokens naming internal ports. Rendering substitutes the
//! public host and remaps each internal port to the host port assigned at
//! start time, matched positionally by declared-port index.

/// Render a connection template against an instance's port assignment.
///
/// `declared_ports` and `assigned_ports` are parallel; a `{port:N}` token
/// whose `N` is not declared is left untouched.
pub fn render_connection_info(
    template: &str,
    public_host: &str,
    declared_ports: &[u16],
    assigned_ports: &[u16],
) -> String {
    let mut rendered = template.replace("{host}", public_host);
    for (index, internal) in declared_ports.iter().enumerate() {
        let Some(host_port) = assigned_ports.get(index) else {
            break;
        };
        let token = format!("{{port:{}}}", internal);
        rendered = rendered.replace(&token, &host_port.to_string());
    }
    rendered
}

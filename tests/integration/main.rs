mod http_surface;
mod protocol_flow;
mod room_lifecycle;

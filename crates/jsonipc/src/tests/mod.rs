//! Tests exercising the client end to end over in-process transports.

mod support;

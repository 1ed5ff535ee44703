//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted — `Response::empty()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! The set is trimmed to the codes the router itself emits (204, 403, 404,
//! 405) plus the codes application handlers commonly return.

/// A commonly used HTTP status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                   // 200
    Created,              // 201
    Accepted,             // 202
    NoContent,            // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,     // 301
    Found,                // 302
    SeeOther,             // 303
    NotModified,          // 304
    TemporaryRedirect,    // 307
    PermanentRedirect,    // 308

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,           // 400
    Unauthorized,         // 401
    Forbidden,            // 403
    NotFound,             // 404
    MethodNotAllowed,     // 405
    Conflict,             // 409
    Gone,                 // 410
    UnprocessableContent, // 422
    TooManyRequests,      // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,  // 500
    NotImplemented,       // 501
    BadGateway,           // 502
    ServiceUnavailable,   // 503
    GatewayTimeout,       // 504
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                   => 200,
            Status::Created              => 201,
            Status::Accepted             => 202,
            Status::NoContent            => 204,
            Status::MovedPermanently     => 301,
            Status::Found                => 302,
            Status::SeeOther             => 303,
            Status::NotModified          => 304,
            Status::TemporaryRedirect    => 307,
            Status::PermanentRedirect    => 308,
            Status::BadRequest           => 400,
            Status::Unauthorized         => 401,
            Status::Forbidden            => 403,
            Status::NotFound             => 404,
            Status::MethodNotAllowed     => 405,
            Status::Conflict             => 409,
            Status::Gone                 => 410,
            Status::UnprocessableContent => 422,
            Status::TooManyRequests      => 429,
            Status::InternalServerError  => 500,
            Status::NotImplemented       => 501,
            Status::BadGateway           => 502,
            Status::ServiceUnavailable   => 503,
            Status::GatewayTimeout       => 504,
        }
    }
}

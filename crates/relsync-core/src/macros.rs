// dispatch_virtual
// Evaluate one expression against whichever virtual end-point variant is
// present; yields `None` for real end-points.
macro_rules! dispatch_virtual {
    ($end_point:expr, $binding:ident => $body:expr) => {
        match $end_point {
            $crate::db::end_point::RelationEndPoint::VirtualObject($binding) => Some($body),
            $crate::db::end_point::RelationEndPoint::Collection($binding) => Some($body),
            $crate::db::end_point::RelationEndPoint::RealObject(_) => None,
        }
    };
}

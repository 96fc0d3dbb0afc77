mod static_type_map;

pub(crate) use static_type_map::StaticTypeMap;

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The compiled-in ISO 3166 dataset.

use crate::CountryInfo;

const fn c(
    alpha2: &'static str,
    alpha3: &'static str,
    name: &'static str,
    capital: &'static str,
    continent: &'static str,
    tld: &'static str,
    currency: &'static str,
    calling_code: &'static str,
) -> CountryInfo {
    CountryInfo {
        alpha2,
        alpha3,
        name,
        capital,
        continent,
        tld,
        currency,
        calling_code,
    }
}

pub const COUNTRIES: &[CountryInfo] = &[
    c("AD", "AND", "Andorra", "Andorra la Vella", "EU", ".ad", "EUR", "376"),
    c("AE", "ARE", "United Arab Emirates", "Abu Dhabi", "AS", ".ae", "AED", "971"),
    c("AF", "AFG", "Afghanistan", "Kabul", "AS", ".af", "AFN", "93"),
    c("AG", "ATG", "Antigua and Barbuda", "Saint John's", "NA", ".ag", "XCD", "1268"),
    c("AI", "AIA", "Anguilla", "The Valley", "NA", ".ai", "XCD", "1264"),
    c("AL", "ALB", "Albania", "Tirana", "EU", ".al", "ALL", "355"),
    c("AM", "ARM", "Armenia", "Yerevan", "AS", ".am", "AMD", "374"),
    c("AO", "AGO", "Angola", "Luanda", "AF", ".ao", "AOA", "244"),
    c("AQ", "ATA", "Antarctica", "", "AN", ".aq", "", "672"),
    c("AR", "ARG", "Argentina", "Buenos Aires", "SA", ".ar", "ARS", "54"),
    c("AS", "ASM", "American Samoa", "Pago Pago", "OC", ".as", "USD", "1684"),
    c("AT", "AUT", "Austria", "Vienna", "EU", ".at", "EUR", "43"),
    c("AU", "AUS", "Australia", "Canberra", "OC", ".au", "AUD", "61"),
    c("AW", "ABW", "Aruba", "Oranjestad", "NA", ".aw", "AWG", "297"),
    c("AX", "ALA", "Aland Islands", "Mariehamn", "EU", ".ax", "EUR", "358"),
    c("AZ", "AZE", "Azerbaijan", "Baku", "AS", ".az", "AZN", "994"),
    c("BA", "BIH", "Bosnia and Herzegovina", "Sarajevo", "EU", ".ba", "BAM", "387"),
    c("BB", "BRB", "Barbados", "Bridgetown", "NA", ".bb", "BBD", "1246"),
    c("BD", "BGD", "Bangladesh", "Dhaka", "AS", ".bd", "BDT", "880"),
    c("BE", "BEL", "Belgium", "Brussels", "EU", ".be", "EUR", "32"),
    c("BF", "BFA", "Burkina Faso", "Ouagadougou", "AF", ".bf", "XOF", "226"),
    c("BG", "BGR", "Bulgaria", "Sofia", "EU", ".bg", "BGN", "359"),
    c("BH", "BHR", "Bahrain", "Manama", "AS", ".bh", "BHD", "973"),
    c("BI", "BDI", "Burundi", "Gitega", "AF", ".bi", "BIF", "257"),
    c("BJ", "BEN", "Benin", "Porto-Novo", "AF", ".bj", "XOF", "229"),
    c("BL", "BLM", "Saint Barthelemy", "Gustavia", "NA", ".bl", "EUR", "590"),
    c("BM", "BMU", "Bermuda", "Hamilton", "NA", ".bm", "BMD", "1441"),
    c("BN", "BRN", "Brunei", "Bandar Seri Begawan", "AS", ".bn", "BND", "673"),
    c("BO", "BOL", "Bolivia", "Sucre", "SA", ".bo", "BOB", "591"),
    c("BQ", "BES", "Bonaire, Sint Eustatius, and Saba", "Kralendijk", "NA", ".bq", "USD", "599"),
    c("BR", "BRA", "Brazil", "Brasilia", "SA", ".br", "BRL", "55"),
    c("BS", "BHS", "Bahamas", "Nassau", "NA", ".bs", "BSD", "1242"),
    c("BT", "BTN", "Bhutan", "Thimphu", "AS", ".bt", "BTN", "975"),
    c("BV", "BVT", "Bouvet Island", "", "AN", ".bv", "NOK", "47"),
    c("BW", "BWA", "Botswana", "Gaborone", "AF", ".bw", "BWP", "267"),
    c("BY", "BLR", "Belarus", "Minsk", "EU", ".by", "BYN", "375"),
    c("BZ", "BLZ", "Belize", "Belmopan", "NA", ".bz", "BZD", "501"),
    c("CA", "CAN", "Canada", "Ottawa", "NA", ".ca", "CAD", "1"),
    c("CC", "CCK", "Cocos (Keeling) Islands", "West Island", "AS", ".cc", "AUD", "61"),
    c("CD", "COD", "DR Congo", "Kinshasa", "AF", ".cd", "CDF", "243"),
    c("CF", "CAF", "Central African Republic", "Bangui", "AF", ".cf", "XAF", "236"),
    c("CG", "COG", "Republic of the Congo", "Brazzaville", "AF", ".cg", "XAF", "242"),
    c("CH", "CHE", "Switzerland", "Bern", "EU", ".ch", "CHF", "41"),
    c("CI", "CIV", "Ivory Coast", "Yamoussoukro", "AF", ".ci", "XOF", "225"),
    c("CK", "COK", "Cook Islands", "Avarua", "OC", ".ck", "NZD", "682"),
    c("CL", "CHL", "Chile", "Santiago", "SA", ".cl", "CLP", "56"),
    c("CM", "CMR", "Cameroon", "Yaounde", "AF", ".cm", "XAF", "237"),
    c("CN", "CHN", "China", "Beijing", "AS", ".cn", "CNY", "86"),
    c("CO", "COL", "Colombia", "Bogota", "SA", ".co", "COP", "57"),
    c("CR", "CRI", "Costa Rica", "San Jose", "NA", ".cr", "CRC", "506"),
    c("CU", "CUB", "Cuba", "Havana", "NA", ".cu", "CUP", "53"),
    c("CV", "CPV", "Cape Verde", "Praia", "AF", ".cv", "CVE", "238"),
    c("CW", "CUW", "Curacao", "Willemstad", "NA", ".cw", "ANG", "599"),
    c("CX", "CXR", "Christmas Island", "Flying Fish Cove", "AS", ".cx", "AUD", "61"),
    c("CY", "CYP", "Cyprus", "Nicosia", "EU", ".cy", "EUR", "357"),
    c("CZ", "CZE", "Czechia", "Prague", "EU", ".cz", "CZK", "420"),
    c("DE", "DEU", "Germany", "Berlin", "EU", ".de", "EUR", "49"),
    c("DJ", "DJI", "Djibouti", "Djibouti", "AF", ".dj", "DJF", "253"),
    c("DK", "DNK", "Denmark", "Copenhagen", "EU", ".dk", "DKK", "45"),
    c("DM", "DMA", "Dominica", "Roseau", "NA", ".dm", "XCD", "1767"),
    c("DO", "DOM", "Dominican Republic", "Santo Domingo", "NA", ".do", "DOP", "1809"),
    c("DZ", "DZA", "Algeria", "Algiers", "AF", ".dz", "DZD", "213"),
    c("EC", "ECU", "Ecuador", "Quito", "SA", ".ec", "USD", "593"),
    c("EE", "EST", "Estonia", "Tallinn", "EU", ".ee", "EUR", "372"),
    c("EG", "EGY", "Egypt", "Cairo", "AF", ".eg", "EGP", "20"),
    c("EH", "ESH", "Western Sahara", "Laayoune", "AF", ".eh", "MAD", "212"),
    c("ER", "ERI", "Eritrea", "Asmara", "AF", ".er", "ERN", "291"),
    c("ES", "ESP", "Spain", "Madrid", "EU", ".es", "EUR", "34"),
    c("ET", "ETH", "Ethiopia", "Addis Ababa", "AF", ".et", "ETB", "251"),
    c("FI", "FIN", "Finland", "Helsinki", "EU", ".fi", "EUR", "358"),
    c("FJ", "FJI", "Fiji", "Suva", "OC", ".fj", "FJD", "679"),
    c("FK", "FLK", "Falkland Islands", "Stanley", "SA", ".fk", "FKP", "500"),
    c("FM", "FSM", "Micronesia", "Palikir", "OC", ".fm", "USD", "691"),
    c("FO", "FRO", "Faroe Islands", "Torshavn", "EU", ".fo", "DKK", "298"),
    c("FR", "FRA", "France", "Paris", "EU", ".fr", "EUR", "33"),
    c("GA", "GAB", "Gabon", "Libreville", "AF", ".ga", "XAF", "241"),
    c("GB", "GBR", "United Kingdom", "London", "EU", ".uk", "GBP", "44"),
    c("GD", "GRD", "Grenada", "Saint George's", "NA", ".gd", "XCD", "1473"),
    c("GE", "GEO", "Georgia", "Tbilisi", "AS", ".ge", "GEL", "995"),
    c("GF", "GUF", "French Guiana", "Cayenne", "SA", ".gf", "EUR", "594"),
    c("GG", "GGY", "Guernsey", "Saint Peter Port", "EU", ".gg", "GBP", "44"),
    c("GH", "GHA", "Ghana", "Accra", "AF", ".gh", "GHS", "233"),
    c("GI", "GIB", "Gibraltar", "Gibraltar", "EU", ".gi", "GIP", "350"),
    c("GL", "GRL", "Greenland", "Nuuk", "NA", ".gl", "DKK", "299"),
    c("GM", "GMB", "Gambia", "Banjul", "AF", ".gm", "GMD", "220"),
    c("GN", "GIN", "Guinea", "Conakry", "AF", ".gn", "GNF", "224"),
    c("GP", "GLP", "Guadeloupe", "Basse-Terre", "NA", ".gp", "EUR", "590"),
    c("GQ", "GNQ", "Equatorial Guinea", "Malabo", "AF", ".gq", "XAF", "240"),
    c("GR", "GRC", "Greece", "Athens", "EU", ".gr", "EUR", "30"),
    c("GS", "SGS", "South Georgia", "King Edward Point", "AN", ".gs", "GBP", "500"),
    c("GT", "GTM", "Guatemala", "Guatemala City", "NA", ".gt", "GTQ", "502"),
    c("GU", "GUM", "Guam", "Hagatna", "OC", ".gu", "USD", "1671"),
    c("GW", "GNB", "Guinea-Bissau", "Bissau", "AF", ".gw", "XOF", "245"),
    c("GY", "GUY", "Guyana", "Georgetown", "SA", ".gy", "GYD", "592"),
    c("HK", "HKG", "Hong Kong", "Hong Kong", "AS", ".hk", "HKD", "852"),
    c("HM", "HMD", "Heard Island and McDonald Islands", "", "AN", ".hm", "AUD", "672"),
    c("HN", "HND", "Honduras", "Tegucigalpa", "NA", ".hn", "HNL", "504"),
    c("HR", "HRV", "Croatia", "Zagreb", "EU", ".hr", "EUR", "385"),
    c("HT", "HTI", "Haiti", "Port-au-Prince", "NA", ".ht", "HTG", "509"),
    c("HU", "HUN", "Hungary", "Budapest", "EU", ".hu", "HUF", "36"),
    c("ID", "IDN", "Indonesia", "Jakarta", "AS", ".id", "IDR", "62"),
    c("IE", "IRL", "Ireland", "Dublin", "EU", ".ie", "EUR", "353"),
    c("IL", "ISR", "Israel", "Jerusalem", "AS", ".il", "ILS", "972"),
    c("IM", "IMN", "Isle of Man", "Douglas", "EU", ".im", "GBP", "44"),
    c("IN", "IND", "India", "New Delhi", "AS", ".in", "INR", "91"),
    c("IO", "IOT", "British Indian Ocean Territory", "Diego Garcia", "AS", ".io", "USD", "246"),
    c("IQ", "IRQ", "Iraq", "Baghdad", "AS", ".iq", "IQD", "964"),
    c("IR", "IRN", "Iran", "Tehran", "AS", ".ir", "IRR", "98"),
    c("IS", "ISL", "Iceland", "Reykjavik", "EU", ".is", "ISK", "354"),
    c("IT", "ITA", "Italy", "Rome", "EU", ".it", "EUR", "39"),
    c("JE", "JEY", "Jersey", "Saint Helier", "EU", ".je", "GBP", "44"),
    c("JM", "JAM", "Jamaica", "Kingston", "NA", ".jm", "JMD", "1876"),
    c("JO", "JOR", "Jordan", "Amman", "AS", ".jo", "JOD", "962"),
    c("JP", "JPN", "Japan", "Tokyo", "AS", ".jp", "JPY", "81"),
    c("KE", "KEN", "Kenya", "Nairobi", "AF", ".ke", "KES", "254"),
    c("KG", "KGZ", "Kyrgyzstan", "Bishkek", "AS", ".kg", "KGS", "996"),
    c("KH", "KHM", "Cambodia", "Phnom Penh", "AS", ".kh", "KHR", "855"),
    c("KI", "KIR", "Kiribati", "Tarawa", "OC", ".ki", "AUD", "686"),
    c("KM", "COM", "Comoros", "Moroni", "AF", ".km", "KMF", "269"),
    c("KN", "KNA", "Saint Kitts and Nevis", "Basseterre", "NA", ".kn", "XCD", "1869"),
    c("KP", "PRK", "North Korea", "Pyongyang", "AS", ".kp", "KPW", "850"),
    c("KR", "KOR", "South Korea", "Seoul", "AS", ".kr", "KRW", "82"),
    c("KW", "KWT", "Kuwait", "Kuwait City", "AS", ".kw", "KWD", "965"),
    c("KY", "CYM", "Cayman Islands", "George Town", "NA", ".ky", "KYD", "1345"),
    c("KZ", "KAZ", "Kazakhstan", "Astana", "AS", ".kz", "KZT", "7"),
    c("LA", "LAO", "Laos", "Vientiane", "AS", ".la", "LAK", "856"),
    c("LB", "LBN", "Lebanon", "Beirut", "AS", ".lb", "LBP", "961"),
    c("LC", "LCA", "Saint Lucia", "Castries", "NA", ".lc", "XCD", "1758"),
    c("LI", "LIE", "Liechtenstein", "Vaduz", "EU", ".li", "CHF", "423"),
    c("LK", "LKA", "Sri Lanka", "Colombo", "AS", ".lk", "LKR", "94"),
    c("LR", "LBR", "Liberia", "Monrovia", "AF", ".lr", "LRD", "231"),
    c("LS", "LSO", "Lesotho", "Maseru", "AF", ".ls", "LSL", "266"),
    c("LT", "LTU", "Lithuania", "Vilnius", "EU", ".lt", "EUR", "370"),
    c("LU", "LUX", "Luxembourg", "Luxembourg", "EU", ".lu", "EUR", "352"),
    c("LV", "LVA", "Latvia", "Riga", "EU", ".lv", "EUR", "371"),
    c("LY", "LBY", "Libya", "Tripoli", "AF", ".ly", "LYD", "218"),
    c("MA", "MAR", "Morocco", "Rabat", "AF", ".ma", "MAD", "212"),
    c("MC", "MCO", "Monaco", "Monaco", "EU", ".mc", "EUR", "377"),
    c("MD", "MDA", "Moldova", "Chisinau", "EU", ".md", "MDL", "373"),
    c("ME", "MNE", "Montenegro", "Podgorica", "EU", ".me", "EUR", "382"),
    c("MF", "MAF", "Saint Martin", "Marigot", "NA", ".mf", "EUR", "590"),
    c("MG", "MDG", "Madagascar", "Antananarivo", "AF", ".mg", "MGA", "261"),
    c("MH", "MHL", "Marshall Islands", "Majuro", "OC", ".mh", "USD", "692"),
    c("MK", "MKD", "North Macedonia", "Skopje", "EU", ".mk", "MKD", "389"),
    c("ML", "MLI", "Mali", "Bamako", "AF", ".ml", "XOF", "223"),
    c("MM", "MMR", "Myanmar", "Naypyidaw", "AS", ".mm", "MMK", "95"),
    c("MN", "MNG", "Mongolia", "Ulaanbaatar", "AS", ".mn", "MNT", "976"),
    c("MO", "MAC", "Macao", "Macao", "AS", ".mo", "MOP", "853"),
    c("MP", "MNP", "Northern Mariana Islands", "Saipan", "OC", ".mp", "USD", "1670"),
    c("MQ", "MTQ", "Martinique", "Fort-de-France", "NA", ".mq", "EUR", "596"),
    c("MR", "MRT", "Mauritania", "Nouakchott", "AF", ".mr", "MRU", "222"),
    c("MS", "MSR", "Montserrat", "Plymouth", "NA", ".ms", "XCD", "1664"),
    c("MT", "MLT", "Malta", "Valletta", "EU", ".mt", "EUR", "356"),
    c("MU", "MUS", "Mauritius", "Port Louis", "AF", ".mu", "MUR", "230"),
    c("MV", "MDV", "Maldives", "Male", "AS", ".mv", "MVR", "960"),
    c("MW", "MWI", "Malawi", "Lilongwe", "AF", ".mw", "MWK", "265"),
    c("MX", "MEX", "Mexico", "Mexico City", "NA", ".mx", "MXN", "52"),
    c("MY", "MYS", "Malaysia", "Kuala Lumpur", "AS", ".my", "MYR", "60"),
    c("MZ", "MOZ", "Mozambique", "Maputo", "AF", ".mz", "MZN", "258"),
    c("NA", "NAM", "Namibia", "Windhoek", "AF", ".na", "NAD", "264"),
    c("NC", "NCL", "New Caledonia", "Noumea", "OC", ".nc", "XPF", "687"),
    c("NE", "NER", "Niger", "Niamey", "AF", ".ne", "XOF", "227"),
    c("NF", "NFK", "Norfolk Island", "Kingston", "OC", ".nf", "AUD", "672"),
    c("NG", "NGA", "Nigeria", "Abuja", "AF", ".ng", "NGN", "234"),
    c("NI", "NIC", "Nicaragua", "Managua", "NA", ".ni", "NIO", "505"),
    c("NL", "NLD", "Netherlands", "Amsterdam", "EU", ".nl", "EUR", "31"),
    c("NO", "NOR", "Norway", "Oslo", "EU", ".no", "NOK", "47"),
    c("NP", "NPL", "Nepal", "Kathmandu", "AS", ".np", "NPR", "977"),
    c("NR", "NRU", "Nauru", "Yaren", "OC", ".nr", "AUD", "674"),
    c("NU", "NIU", "Niue", "Alofi", "OC", ".nu", "NZD", "683"),
    c("NZ", "NZL", "New Zealand", "Wellington", "OC", ".nz", "NZD", "64"),
    c("OM", "OMN", "Oman", "Muscat", "AS", ".om", "OMR", "968"),
    c("PA", "PAN", "Panama", "Panama City", "NA", ".pa", "PAB", "507"),
    c("PE", "PER", "Peru", "Lima", "SA", ".pe", "PEN", "51"),
    c("PF", "PYF", "French Polynesia", "Papeete", "OC", ".pf", "XPF", "689"),
    c("PG", "PNG", "Papua New Guinea", "Port Moresby", "OC", ".pg", "PGK", "675"),
    c("PH", "PHL", "Philippines", "Manila", "AS", ".ph", "PHP", "63"),
    c("PK", "PAK", "Pakistan", "Islamabad", "AS", ".pk", "PKR", "92"),
    c("PL", "POL", "Poland", "Warsaw", "EU", ".pl", "PLN", "48"),
    c("PM", "SPM", "Saint Pierre and Miquelon", "Saint-Pierre", "NA", ".pm", "EUR", "508"),
    c("PN", "PCN", "Pitcairn Islands", "Adamstown", "OC", ".pn", "NZD", "64"),
    c("PR", "PRI", "Puerto Rico", "San Juan", "NA", ".pr", "USD", "1787"),
    c("PS", "PSE", "Palestine", "Ramallah", "AS", ".ps", "ILS", "970"),
    c("PT", "PRT", "Portugal", "Lisbon", "EU", ".pt", "EUR", "351"),
    c("PW", "PLW", "Palau", "Ngerulmud", "OC", ".pw", "USD", "680"),
    c("PY", "PRY", "Paraguay", "Asuncion", "SA", ".py", "PYG", "595"),
    c("QA", "QAT", "Qatar", "Doha", "AS", ".qa", "QAR", "974"),
    c("RE", "REU", "Reunion", "Saint-Denis", "AF", ".re", "EUR", "262"),
    c("RO", "ROU", "Romania", "Bucharest", "EU", ".ro", "RON", "40"),
    c("RS", "SRB", "Serbia", "Belgrade", "EU", ".rs", "RSD", "381"),
    c("RU", "RUS", "Russia", "Moscow", "EU", ".ru", "RUB", "7"),
    c("RW", "RWA", "Rwanda", "Kigali", "AF", ".rw", "RWF", "250"),
    c("SA", "SAU", "Saudi Arabia", "Riyadh", "AS", ".sa", "SAR", "966"),
    c("SB", "SLB", "Solomon Islands", "Honiara", "OC", ".sb", "SBD", "677"),
    c("SC", "SYC", "Seychelles", "Victoria", "AF", ".sc", "SCR", "248"),
    c("SD", "SDN", "Sudan", "Khartoum", "AF", ".sd", "SDG", "249"),
    c("SE", "SWE", "Sweden", "Stockholm", "EU", ".se", "SEK", "46"),
    c("SG", "SGP", "Singapore", "Singapore", "AS", ".sg", "SGD", "65"),
    c("SH", "SHN", "Saint Helena", "Jamestown", "AF", ".sh", "SHP", "290"),
    c("SI", "SVN", "Slovenia", "Ljubljana", "EU", ".si", "EUR", "386"),
    c("SJ", "SJM", "Svalbard and Jan Mayen", "Longyearbyen", "EU", ".sj", "NOK", "47"),
    c("SK", "SVK", "Slovakia", "Bratislava", "EU", ".sk", "EUR", "421"),
    c("SL", "SLE", "Sierra Leone", "Freetown", "AF", ".sl", "SLL", "232"),
    c("SM", "SMR", "San Marino", "San Marino", "EU", ".sm", "EUR", "378"),
    c("SN", "SEN", "Senegal", "Dakar", "AF", ".sn", "XOF", "221"),
    c("SO", "SOM", "Somalia", "Mogadishu", "AF", ".so", "SOS", "252"),
    c("SR", "SUR", "Suriname", "Paramaribo", "SA", ".sr", "SRD", "597"),
    c("SS", "SSD", "South Sudan", "Juba", "AF", ".ss", "SSP", "211"),
    c("ST", "STP", "Sao Tome and Principe", "Sao Tome", "AF", ".st", "STN", "239"),
    c("SV", "SLV", "El Salvador", "San Salvador", "NA", ".sv", "USD", "503"),
    c("SX", "SXM", "Sint Maarten", "Philipsburg", "NA", ".sx", "ANG", "1721"),
    c("SY", "SYR", "Syria", "Damascus", "AS", ".sy", "SYP", "963"),
    c("SZ", "SWZ", "Eswatini", "Mbabane", "AF", ".sz", "SZL", "268"),
    c("TC", "TCA", "Turks and Caicos Islands", "Cockburn Town", "NA", ".tc", "USD", "1649"),
    c("TD", "TCD", "Chad", "N'Djamena", "AF", ".td", "XAF", "235"),
    c("TF", "ATF", "French Southern Territories", "Port-aux-Francais", "AN", ".tf", "EUR", "262"),
    c("TG", "TGO", "Togo", "Lome", "AF", ".tg", "XOF", "228"),
    c("TH", "THA", "Thailand", "Bangkok", "AS", ".th", "THB", "66"),
    c("TJ", "TJK", "Tajikistan", "Dushanbe", "AS", ".tj", "TJS", "992"),
    c("TK", "TKL", "Tokelau", "Fakaofo", "OC", ".tk", "NZD", "690"),
    c("TL", "TLS", "Timor-Leste", "Dili", "AS", ".tl", "USD", "670"),
    c("TM", "TKM", "Turkmenistan", "Ashgabat", "AS", ".tm", "TMT", "993"),
    c("TN", "TUN", "Tunisia", "Tunis", "AF", ".tn", "TND", "216"),
    c("TO", "TON", "Tonga", "Nuku'alofa", "OC", ".to", "TOP", "676"),
    c("TR", "TUR", "Turkey", "Ankara", "AS", ".tr", "TRY", "90"),
    c("TT", "TTO", "Trinidad and Tobago", "Port of Spain", "NA", ".tt", "TTD", "1868"),
    c("TV", "TUV", "Tuvalu", "Funafuti", "OC", ".tv", "AUD", "688"),
    c("TW", "TWN", "Taiwan", "Taipei", "AS", ".tw", "TWD", "886"),
    c("TZ", "TZA", "Tanzania", "Dodoma", "AF", ".tz", "TZS", "255"),
    c("UA", "UKR", "Ukraine", "Kyiv", "EU", ".ua", "UAH", "380"),
    c("UG", "UGA", "Uganda", "Kampala", "AF", ".ug", "UGX", "256"),
    c("UM", "UMI", "U.S. Minor Outlying Islands", "", "OC", ".um", "USD", "1"),
    c("US", "USA", "United States", "Washington, D.C.", "NA", ".us", "USD", "1"),
    c("UY", "URY", "Uruguay", "Montevideo", "SA", ".uy", "UYU", "598"),
    c("UZ", "UZB", "Uzbekistan", "Tashkent", "AS", ".uz", "UZS", "998"),
    c("VA", "VAT", "Vatican City", "Vatican City", "EU", ".va", "EUR", "379"),
    c("VC", "VCT", "Saint Vincent and the Grenadines", "Kingstown", "NA", ".vc", "XCD", "1784"),
    c("VE", "VEN", "Venezuela", "Caracas", "SA", ".ve", "VES", "58"),
    c("VG", "VGB", "British Virgin Islands", "Road Town", "NA", ".vg", "USD", "1284"),
    c("VI", "VIR", "U.S. Virgin Islands", "Charlotte Amalie", "NA", ".vi", "USD", "1340"),
    c("VN", "VNM", "Vietnam", "Hanoi", "AS", ".vn", "VND", "84"),
    c("VU", "VUT", "Vanuatu", "Port Vila", "OC", ".vu", "VUV", "678"),
    c("WF", "WLF", "Wallis and Futuna", "Mata-Utu", "OC", ".wf", "XPF", "681"),
    c("WS", "WSM", "Samoa", "Apia", "OC", ".ws", "WST", "685"),
    c("YE", "YEM", "Yemen", "Sanaa", "AS", ".ye", "YER", "967"),
    c("YT", "MYT", "Mayotte", "Mamoudzou", "AF", ".yt", "EUR", "262"),
    c("ZA", "ZAF", "South Africa", "Pretoria", "AF", ".za", "ZAR", "27"),
    c("ZM", "ZMB", "Zambia", "Lusaka", "AF", ".zm", "ZMW", "260"),
    c("ZW", "ZWE", "Zimbabwe", "Harare", "AF", ".zw", "ZWL", "263"),
];
